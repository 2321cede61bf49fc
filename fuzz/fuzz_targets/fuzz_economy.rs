#![no_main]

//! Economy fuzzer.
//!
//! Drives arbitrary grants, spends, XP and clock jumps through a
//! fuzzer-chosen economy config and checks the range invariants after
//! every step.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mergeboard::game::{EconomyConfig, Resource};
use mergeboard::Economy;

#[derive(Arbitrary, Debug, Clone, Copy)]
enum FuzzResource {
    Energy,
    Coins,
    Gems,
}

impl From<FuzzResource> for Resource {
    fn from(r: FuzzResource) -> Self {
        match r {
            FuzzResource::Energy => Resource::Energy,
            FuzzResource::Coins => Resource::Coins,
            FuzzResource::Gems => Resource::Gems,
        }
    }
}

/// A fuzzer-generated economy operation.
#[derive(Arbitrary, Debug, Clone)]
enum EconomyOp {
    Grant(FuzzResource, u64),
    Spend(FuzzResource, u64),
    AddXp(u32),
    /// Move the clock forward by this many milliseconds.
    Advance(u32),
    /// Move the clock backward (a skewed device clock).
    Rewind(u32),
}

/// Structured input for economy fuzzing.
#[derive(Arbitrary, Debug)]
struct EconomyInput {
    base_max_energy: u16,
    max_energy_per_level: u8,
    regen_interval_ms: u32,
    regen_per_interval: u8,
    xp_base: u16,
    xp_step: u16,
    ops: Vec<EconomyOp>,
}

fuzz_target!(|input: EconomyInput| {
    let config = EconomyConfig {
        base_max_energy: u64::from(input.base_max_energy),
        max_energy_per_level: u64::from(input.max_energy_per_level),
        regen_interval_ms: u64::from(input.regen_interval_ms),
        regen_per_interval: u64::from(input.regen_per_interval),
        xp_base: u64::from(input.xp_base),
        xp_step: u64::from(input.xp_step),
        ..EconomyConfig::default()
    };
    if config.validate().is_err() {
        return;
    }

    let mut now: u64 = 1_000_000_000;
    let mut economy = Economy::new(config, now);

    for op in input.ops.into_iter().take(200) {
        match op {
            EconomyOp::Grant(r, amount) => {
                let credited = economy.grant(r.into(), amount);
                assert!(credited <= amount);
            }
            EconomyOp::Spend(r, amount) => {
                let resource = Resource::from(r);
                let before = economy.balance(resource);
                let spent = economy.spend(resource, amount);
                assert_eq!(spent, before >= amount);
                let expected = if spent { before - amount } else { before };
                assert_eq!(economy.balance(resource), expected);
            }
            EconomyOp::AddXp(amount) => {
                let level = economy.level();
                economy.add_xp(u64::from(amount));
                assert!(economy.level() >= level);
            }
            EconomyOp::Advance(ms) => {
                now = now.saturating_add(u64::from(ms));
                let last = economy.state().last_energy_timestamp;
                economy.regenerate_energy(now);
                assert!(economy.state().last_energy_timestamp >= last);
                assert!(economy.state().last_energy_timestamp <= now.max(last));
            }
            EconomyOp::Rewind(ms) => {
                now = now.saturating_sub(u64::from(ms));
                assert_eq!(economy.regenerate_energy(now), 0);
            }
        }

        assert!(economy.energy() <= economy.max_energy(), "energy above cap");
        assert!(economy.level() >= 1, "level below 1");
        assert!(
            economy.xp() < economy.xp_threshold() || economy.level() == u32::MAX,
            "xp left at or above threshold"
        );
    }
});
