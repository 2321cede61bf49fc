//! Economy state machine: energy, coins, gems, XP and level.
//!
//! # Rules
//!
//! - Spends are check-then-deduct: an unaffordable spend changes nothing.
//! - Energy never exceeds `max_energy`; grants are clamped.
//! - XP past the current threshold levels up, possibly several times from
//!   one grant. Each level gained pays its own bonus, raises `max_energy`
//!   and refills energy.
//! - Regeneration credits whole intervals only and advances the stored
//!   timestamp by exactly the credited intervals, so partial progress
//!   toward the next tick carries over between calls.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Timestamp;
use crate::config::ConfigError;

/// A spendable balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Action-gating energy.
    Energy,
    /// Soft currency.
    Coins,
    /// Hard currency.
    Gems,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Energy => "energy",
            Self::Coins => "coins",
            Self::Gems => "gems",
        };
        f.write_str(name)
    }
}

/// A multi-resource price, paid all-or-nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Cost {
    /// Energy part.
    pub energy: u64,
    /// Coin part.
    pub coins: u64,
    /// Gem part.
    pub gems: u64,
}

impl Cost {
    /// A price in coins only.
    #[must_use]
    pub const fn coins(coins: u64) -> Self {
        Self {
            energy: 0,
            coins,
            gems: 0,
        }
    }

    /// A price in gems only.
    #[must_use]
    pub const fn gems(gems: u64) -> Self {
        Self {
            energy: 0,
            coins: 0,
            gems,
        }
    }

    fn parts(self) -> [(Resource, u64); 3] {
        [
            (Resource::Energy, self.energy),
            (Resource::Coins, self.coins),
            (Resource::Gems, self.gems),
        ]
    }
}

/// A reward bundle. XP is routed through level-up handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Reward {
    /// Coins granted.
    pub coins: u64,
    /// Gems granted.
    pub gems: u64,
    /// Energy granted (clamped to max).
    pub energy: u64,
    /// XP granted.
    pub xp: u64,
}

/// Tuning parameters of the economy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Energy cap at level 1.
    pub base_max_energy: u64,
    /// Energy cap increase per level gained.
    pub max_energy_per_level: u64,
    /// Coins granted per level gained.
    pub level_up_coins: u64,
    /// Gems granted per level gained.
    pub level_up_gems: u64,
    /// Length of one regeneration interval.
    pub regen_interval_ms: u64,
    /// Energy credited per interval.
    pub regen_per_interval: u64,
    /// Linear part of the XP threshold.
    pub xp_base: u64,
    /// Quadratic part of the XP threshold.
    pub xp_step: u64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            base_max_energy: 100,
            max_energy_per_level: 5,
            level_up_coins: 50,
            level_up_gems: 5,
            regen_interval_ms: 120_000,
            regen_per_interval: 1,
            xp_base: 50,
            xp_step: 10,
        }
    }
}

impl EconomyConfig {
    /// XP needed to go from `level` to `level + 1`.
    ///
    /// `xp_base * level + xp_step * (level - 1)^2`, strictly increasing in
    /// `level` while `xp_base >= 1`.
    #[must_use]
    pub fn xp_threshold(&self, level: u32) -> u64 {
        let level = u64::from(level.max(1));
        let above_first = level - 1;
        self.xp_base
            .saturating_mul(level)
            .saturating_add(self.xp_step.saturating_mul(above_first.saturating_mul(above_first)))
    }

    /// Energy cap at a given level.
    #[must_use]
    pub fn max_energy_at(&self, level: u32) -> u64 {
        let gained = u64::from(level.max(1) - 1);
        self.base_max_energy
            .saturating_add(self.max_energy_per_level.saturating_mul(gained))
    }

    /// Reject configs that break the economy's guarantees.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero regeneration interval or
    /// a zero `xp_base`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.regen_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "economy.regen_interval_ms must be positive".into(),
            ));
        }
        if self.xp_base == 0 {
            return Err(ConfigError::Invalid(
                "economy.xp_base must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Player balances and progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyState {
    /// Current energy, at most `max_energy`.
    pub energy: u64,
    /// Energy cap.
    pub max_energy: u64,
    /// Coin balance.
    pub coins: u64,
    /// Gem balance.
    pub gems: u64,
    /// XP toward the next level.
    pub xp: u64,
    /// Player level, starting at 1.
    pub level: u32,
    /// Time up to which regeneration has been accounted.
    pub last_energy_timestamp: Timestamp,
}

impl EconomyState {
    /// Level 1 state with full energy and empty wallets.
    #[must_use]
    pub fn new(config: &EconomyConfig, now: Timestamp) -> Self {
        Self {
            energy: config.base_max_energy,
            max_energy: config.base_max_energy,
            coins: 0,
            gems: 0,
            xp: 0,
            level: 1,
            last_energy_timestamp: now,
        }
    }
}

/// Spend rejected for lack of funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EconomyError {
    /// The balance is below the requested amount.
    #[error("insufficient {resource}: need {needed}, have {available}")]
    InsufficientFunds {
        /// Resource that fell short.
        resource: Resource,
        /// Amount requested.
        needed: u64,
        /// Balance at the time of the request.
        available: u64,
    },
}

/// What one XP grant did to the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelUpReport {
    /// Levels gained.
    pub levels_gained: u32,
    /// Coins granted by level-ups.
    pub coins: u64,
    /// Gems granted by level-ups.
    pub gems: u64,
    /// Energy granted by level-up refills.
    pub energy: u64,
}

impl LevelUpReport {
    /// Fold another report into this one.
    pub fn absorb(&mut self, other: LevelUpReport) {
        self.levels_gained += other.levels_gained;
        self.coins = self.coins.saturating_add(other.coins);
        self.gems = self.gems.saturating_add(other.gems);
        self.energy = self.energy.saturating_add(other.energy);
    }
}

/// The economy: tuning plus current state.
#[derive(Debug, Clone, Copy)]
pub struct Economy {
    config: EconomyConfig,
    state: EconomyState,
}

impl Economy {
    /// Start a level 1 economy at `now`.
    #[must_use]
    pub fn new(config: EconomyConfig, now: Timestamp) -> Self {
        Self {
            state: EconomyState::new(&config, now),
            config,
        }
    }

    /// Resume from a saved state.
    ///
    /// Out-of-range fields are pulled back into range: level at least 1,
    /// energy at most the cap.
    #[must_use]
    pub fn from_state(config: EconomyConfig, mut state: EconomyState) -> Self {
        if state.level == 0 {
            tracing::warn!("restored economy had level 0, resetting to 1");
            state.level = 1;
        }
        if state.energy > state.max_energy {
            tracing::warn!(
                energy = state.energy,
                max_energy = state.max_energy,
                "restored energy above cap, clamping"
            );
            state.energy = state.max_energy;
        }
        Self { config, state }
    }

    /// Tuning parameters.
    #[must_use]
    pub const fn config(&self) -> &EconomyConfig {
        &self.config
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &EconomyState {
        &self.state
    }

    /// Current energy.
    #[must_use]
    pub const fn energy(&self) -> u64 {
        self.state.energy
    }

    /// Current energy cap.
    #[must_use]
    pub const fn max_energy(&self) -> u64 {
        self.state.max_energy
    }

    /// Coin balance.
    #[must_use]
    pub const fn coins(&self) -> u64 {
        self.state.coins
    }

    /// Gem balance.
    #[must_use]
    pub const fn gems(&self) -> u64 {
        self.state.gems
    }

    /// XP toward the next level.
    #[must_use]
    pub const fn xp(&self) -> u64 {
        self.state.xp
    }

    /// Player level.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.state.level
    }

    /// XP needed to leave the current level.
    #[must_use]
    pub fn xp_threshold(&self) -> u64 {
        self.config.xp_threshold(self.state.level)
    }

    /// Balance of one resource.
    #[must_use]
    pub const fn balance(&self, resource: Resource) -> u64 {
        match resource {
            Resource::Energy => self.state.energy,
            Resource::Coins => self.state.coins,
            Resource::Gems => self.state.gems,
        }
    }

    fn balance_mut(&mut self, resource: Resource) -> &mut u64 {
        match resource {
            Resource::Energy => &mut self.state.energy,
            Resource::Coins => &mut self.state.coins,
            Resource::Gems => &mut self.state.gems,
        }
    }

    /// Check a balance without spending.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InsufficientFunds`] if the balance is short.
    pub fn check(&self, resource: Resource, amount: u64) -> Result<(), EconomyError> {
        let available = self.balance(resource);
        if available < amount {
            return Err(EconomyError::InsufficientFunds {
                resource,
                needed: amount,
                available,
            });
        }
        Ok(())
    }

    /// Deduct `amount` or leave the state untouched.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InsufficientFunds`] if the balance is short.
    pub fn try_spend(&mut self, resource: Resource, amount: u64) -> Result<(), EconomyError> {
        self.check(resource, amount)?;
        *self.balance_mut(resource) -= amount;
        Ok(())
    }

    /// Deduct `amount` if affordable. Returns `false` (and changes nothing)
    /// otherwise.
    pub fn spend(&mut self, resource: Resource, amount: u64) -> bool {
        self.try_spend(resource, amount).is_ok()
    }

    /// Check that every part of a price is affordable.
    ///
    /// # Errors
    ///
    /// Returns the first short resource in energy, coins, gems order.
    pub fn check_cost(&self, cost: Cost) -> Result<(), EconomyError> {
        for (resource, amount) in cost.parts() {
            self.check(resource, amount)?;
        }
        Ok(())
    }

    /// Pay a multi-resource price all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns the first short resource; nothing is deducted in that case.
    pub fn spend_cost(&mut self, cost: Cost) -> Result<(), EconomyError> {
        self.check_cost(cost)?;
        for (resource, amount) in cost.parts() {
            *self.balance_mut(resource) -= amount;
        }
        Ok(())
    }

    /// Credit a resource. Energy is clamped to the cap.
    ///
    /// Returns the amount actually credited.
    pub fn grant(&mut self, resource: Resource, amount: u64) -> u64 {
        match resource {
            Resource::Energy => {
                let room = self.state.max_energy.saturating_sub(self.state.energy);
                let credited = amount.min(room);
                self.state.energy += credited;
                credited
            }
            Resource::Coins | Resource::Gems => {
                let balance = self.balance_mut(resource);
                *balance = balance.saturating_add(amount);
                amount
            }
        }
    }

    /// Grant a reward bundle, XP last so level-up refills are not wasted.
    pub fn grant_reward(&mut self, reward: Reward) -> LevelUpReport {
        self.grant(Resource::Coins, reward.coins);
        self.grant(Resource::Gems, reward.gems);
        self.grant(Resource::Energy, reward.energy);
        self.add_xp(reward.xp)
    }

    /// Add XP, applying every level-up it crosses.
    ///
    /// A zero threshold (an unvalidated config with `xp_base == 0`) stops
    /// progression instead of granting free levels.
    pub fn add_xp(&mut self, amount: u64) -> LevelUpReport {
        let mut report = LevelUpReport::default();
        self.state.xp = self.state.xp.saturating_add(amount);

        loop {
            let threshold = self.config.xp_threshold(self.state.level);
            if threshold == 0 {
                tracing::warn!(level = self.state.level, "zero xp threshold, no level-up");
                break;
            }
            if self.state.xp < threshold || self.state.level == u32::MAX {
                break;
            }
            self.state.xp -= threshold;
            self.level_up(&mut report);
        }

        if report.levels_gained > 0 {
            tracing::debug!(
                level = self.state.level,
                gained = report.levels_gained,
                "level up"
            );
        }
        report
    }

    /// One level transition with its side effects.
    fn level_up(&mut self, report: &mut LevelUpReport) {
        self.state.level += 1;
        self.state.max_energy = self
            .state
            .max_energy
            .saturating_add(self.config.max_energy_per_level);

        let coins = self.grant(Resource::Coins, self.config.level_up_coins);
        let gems = self.grant(Resource::Gems, self.config.level_up_gems);
        let energy = self.grant(Resource::Energy, self.state.max_energy);

        report.levels_gained += 1;
        report.coins = report.coins.saturating_add(coins);
        report.gems = report.gems.saturating_add(gems);
        report.energy = report.energy.saturating_add(energy);
    }

    /// Credit energy for whole intervals elapsed since the last accounting.
    ///
    /// Returns the energy credited. A clock earlier than the stored
    /// timestamp credits nothing and leaves the timestamp alone.
    pub fn regenerate_energy(&mut self, now: Timestamp) -> u64 {
        let interval = self.config.regen_interval_ms.max(1);
        let elapsed = now.saturating_sub(self.state.last_energy_timestamp);
        let intervals = elapsed / interval;
        if intervals == 0 {
            return 0;
        }

        let earned = intervals.saturating_mul(self.config.regen_per_interval);
        let credited = self.grant(Resource::Energy, earned);
        self.state.last_energy_timestamp += intervals * interval;

        tracing::debug!(intervals, credited, energy = self.state.energy, "energy regenerated");
        credited
    }

    /// Time until the next regeneration tick, or None when energy is full.
    #[must_use]
    pub fn time_to_next_energy(&self, now: Timestamp) -> Option<u64> {
        if self.state.energy >= self.state.max_energy {
            return None;
        }
        let interval = self.config.regen_interval_ms.max(1);
        let elapsed = now.saturating_sub(self.state.last_energy_timestamp);
        Some(interval - elapsed % interval)
    }
}
