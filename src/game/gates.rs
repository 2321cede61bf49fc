//! Task and area gates: requirement checks and atomic completion.
//!
//! A gate lists requirements over resources, board items and level. When
//! every requirement is met it can be completed, which consumes the
//! resource and item requirements, records the completion and grants the
//! gate's reward. Areas unlock once; tasks may be completed repeatedly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::game::{
    Board, Cost, Economy, EconomyError, ItemCatalog, ItemTypeId, LevelUpReport, Resource, Reward,
};

/// What a gate unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    /// Repeatable order.
    Task,
    /// One-time content unlock.
    Area,
}

/// A single condition of a gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Requirement {
    /// Pay an amount of a resource.
    Resource {
        /// Resource paid.
        resource: Resource,
        /// Amount paid.
        amount: u64,
    },
    /// Hand in board items of one type.
    Items {
        /// Type handed in.
        item_type: ItemTypeId,
        /// How many.
        count: u32,
    },
    /// Reach a level. Nothing is consumed.
    Level {
        /// Minimum level.
        min: u32,
    },
}

/// A task or area unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    /// Unique gate id.
    pub id: String,
    /// Task or area.
    pub kind: GateKind,
    /// Conditions, all of which must hold.
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    /// Granted on completion.
    #[serde(default)]
    pub reward: Reward,
}

/// One unmet requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortfall {
    /// Not enough of a resource.
    Resource {
        /// Resource short.
        resource: Resource,
        /// Amount required.
        needed: u64,
        /// Current balance.
        available: u64,
    },
    /// Not enough items of a type on the board.
    Items {
        /// Type short.
        item_type: ItemTypeId,
        /// Count required.
        needed: u32,
        /// Count on the board.
        available: u32,
    },
    /// Level too low.
    Level {
        /// Level required.
        needed: u32,
        /// Current level.
        current: u32,
    },
}

/// Result of checking a gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStatus {
    /// Every requirement holds.
    Ready,
    /// An area that is already unlocked.
    AlreadyCompleted,
    /// Requirements that do not hold: level, then resources, then items.
    Missing(Vec<Shortfall>),
}

/// Result of completing a gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Requirements consumed and reward granted.
    Completed {
        /// Reward granted.
        reward: Reward,
        /// Level-ups triggered by the reward's XP.
        level_up: LevelUpReport,
    },
    /// An area that is already unlocked. Nothing changed.
    AlreadyCompleted,
    /// Unmet requirements. Nothing changed.
    Missing(Vec<Shortfall>),
}

/// Completion counts per gate id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GateProgress {
    completed: BTreeMap<String, u32>,
}

impl GateProgress {
    /// No gates completed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times a gate has been completed.
    #[must_use]
    pub fn times_completed(&self, gate_id: &str) -> u32 {
        self.completed.get(gate_id).copied().unwrap_or(0)
    }

    /// Whether a gate has been completed at least once.
    #[must_use]
    pub fn is_completed(&self, gate_id: &str) -> bool {
        self.times_completed(gate_id) > 0
    }

    /// Completed gate ids with their counts, sorted by id.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.completed.iter().map(|(id, n)| (id.as_str(), *n))
    }

    fn record(&mut self, gate_id: &str) {
        let count = self.completed.entry(gate_id.to_owned()).or_insert(0);
        *count = count.saturating_add(1);
    }
}

/// Resource and item totals a gate consumes, merged per resource and type.
#[derive(Default)]
struct Demand {
    cost: Cost,
    items: BTreeMap<ItemTypeId, u32>,
    min_level: u32,
}

impl Demand {
    fn of(gate: &Gate) -> Self {
        let mut demand = Self::default();
        for requirement in &gate.requirements {
            match requirement {
                Requirement::Resource { resource, amount } => {
                    let slot = match resource {
                        Resource::Energy => &mut demand.cost.energy,
                        Resource::Coins => &mut demand.cost.coins,
                        Resource::Gems => &mut demand.cost.gems,
                    };
                    *slot = slot.saturating_add(*amount);
                }
                Requirement::Items { item_type, count } => {
                    let slot = demand.items.entry(item_type.clone()).or_insert(0);
                    *slot = slot.saturating_add(*count);
                }
                Requirement::Level { min } => demand.min_level = demand.min_level.max(*min),
            }
        }
        demand
    }

    fn shortfalls(&self, board: &Board, economy: &Economy) -> Vec<Shortfall> {
        let mut missing = Vec::new();
        if economy.level() < self.min_level {
            missing.push(Shortfall::Level {
                needed: self.min_level,
                current: economy.level(),
            });
        }
        for (resource, needed) in [
            (Resource::Energy, self.cost.energy),
            (Resource::Coins, self.cost.coins),
            (Resource::Gems, self.cost.gems),
        ] {
            let available = economy.balance(resource);
            if available < needed {
                missing.push(Shortfall::Resource {
                    resource,
                    needed,
                    available,
                });
            }
        }
        for (item_type, &needed) in &self.items {
            let available = u32::try_from(board.count_of(item_type)).unwrap_or(u32::MAX);
            if available < needed {
                missing.push(Shortfall::Items {
                    item_type: item_type.clone(),
                    needed,
                    available,
                });
            }
        }
        missing
    }
}

/// Check whether a gate can be completed now.
///
/// # Errors
///
/// Returns [`EngineError::UnknownItemType`](crate::error::EngineError::UnknownItemType)
/// if an item requirement names a type missing from the catalog.
pub fn check_gate(
    board: &Board,
    catalog: &ItemCatalog,
    economy: &Economy,
    progress: &GateProgress,
    gate: &Gate,
) -> EngineResult<GateStatus> {
    if gate.kind == GateKind::Area && progress.is_completed(&gate.id) {
        return Ok(GateStatus::AlreadyCompleted);
    }
    let demand = Demand::of(gate);
    for item_type in demand.items.keys() {
        catalog.lookup(item_type)?;
    }

    let missing = demand.shortfalls(board, economy);
    if missing.is_empty() {
        Ok(GateStatus::Ready)
    } else {
        Ok(GateStatus::Missing(missing))
    }
}

/// Complete a gate: consume its requirements, record it and grant the
/// reward. Either everything happens or nothing does.
///
/// Items are taken in row-major board order.
///
/// # Errors
///
/// Returns [`EngineError::UnknownItemType`](crate::error::EngineError::UnknownItemType)
/// if an item requirement names a type missing from the catalog.
pub fn complete_gate(
    board: &mut Board,
    catalog: &ItemCatalog,
    economy: &mut Economy,
    progress: &mut GateProgress,
    gate: &Gate,
) -> EngineResult<GateOutcome> {
    match check_gate(board, catalog, economy, progress, gate)? {
        GateStatus::Ready => {}
        GateStatus::AlreadyCompleted => return Ok(GateOutcome::AlreadyCompleted),
        GateStatus::Missing(missing) => return Ok(GateOutcome::Missing(missing)),
    }

    let demand = Demand::of(gate);
    if let Err(err) = economy.spend_cost(demand.cost) {
        // Unreachable after a successful check; reported as a shortfall.
        let EconomyError::InsufficientFunds {
            resource,
            needed,
            available,
        } = err;
        return Ok(GateOutcome::Missing(vec![Shortfall::Resource {
            resource,
            needed,
            available,
        }]));
    }

    for (item_type, &count) in &demand.items {
        let taken: Vec<_> = board
            .items_of(item_type)
            .take(usize::try_from(count).unwrap_or(usize::MAX))
            .map(|item| item.id)
            .collect();
        for id in taken {
            board.remove(id);
        }
    }

    progress.record(&gate.id);
    let level_up = economy.grant_reward(gate.reward);

    tracing::debug!(
        gate = %gate.id,
        kind = ?gate.kind,
        times = progress.times_completed(&gate.id),
        "gate completed"
    );
    Ok(GateOutcome::Completed {
        reward: gate.reward,
        level_up,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Category, Coord, EconomyConfig, GridConfig, ItemDefinition};

    fn catalog() -> ItemCatalog {
        ItemCatalog::from_definitions(vec![ItemDefinition {
            id: ItemTypeId::new("flower_2"),
            tier: 2,
            category: Category::ConsumablePlant,
            merge_target: None,
            generator: None,
            chest: None,
            coin_value: 3,
            xp_value: 2,
            clears_on_merge: false,
        }])
        .unwrap()
    }

    fn order(kind: GateKind) -> Gate {
        Gate {
            id: "first_bouquet".into(),
            kind,
            requirements: vec![
                Requirement::Items {
                    item_type: ItemTypeId::new("flower_2"),
                    count: 2,
                },
                Requirement::Resource {
                    resource: Resource::Coins,
                    amount: 10,
                },
            ],
            reward: Reward {
                gems: 3,
                xp: 20,
                ..Reward::default()
            },
        }
    }

    fn setup(flowers: u16) -> (Board, Economy) {
        let mut board = Board::new(GridConfig::new(3, 3)).unwrap();
        for x in 0..flowers {
            board
                .spawn(ItemTypeId::new("flower_2"), Coord::new(x, 1), None)
                .unwrap();
        }
        let mut economy = Economy::new(EconomyConfig::default(), 0);
        economy.grant(Resource::Coins, 15);
        (board, economy)
    }

    #[test]
    fn test_check_reports_every_shortfall() {
        let (board, economy) = setup(1);
        let mut gate = order(GateKind::Task);
        gate.requirements.push(Requirement::Level { min: 4 });
        gate.requirements.push(Requirement::Resource {
            resource: Resource::Coins,
            amount: 10,
        });

        let status = check_gate(&board, &catalog(), &economy, &GateProgress::new(), &gate).unwrap();
        let GateStatus::Missing(missing) = status else {
            panic!("expected shortfalls, got {status:?}");
        };
        assert_eq!(missing.len(), 3);
        assert!(missing.contains(&Shortfall::Level {
            needed: 4,
            current: 1
        }));
        assert!(missing.contains(&Shortfall::Resource {
            resource: Resource::Coins,
            needed: 20,
            available: 15
        }));
        assert!(missing.contains(&Shortfall::Items {
            item_type: ItemTypeId::new("flower_2"),
            needed: 2,
            available: 1
        }));
    }

    #[test]
    fn test_complete_consumes_and_rewards() {
        let (mut board, mut economy) = setup(3);
        let mut progress = GateProgress::new();

        let outcome = complete_gate(
            &mut board,
            &catalog(),
            &mut economy,
            &mut progress,
            &order(GateKind::Task),
        )
        .unwrap();
        assert!(matches!(outcome, GateOutcome::Completed { .. }));

        // Row-major: the two left-most flowers go, the right-most stays.
        assert_eq!(board.len(), 1);
        assert!(board.item_at(Coord::new(2, 1)).is_some());
        assert_eq!(economy.coins(), 5);
        assert_eq!(economy.gems(), 3);
        assert_eq!(economy.xp(), 20);
        assert_eq!(progress.times_completed("first_bouquet"), 1);
    }

    #[test]
    fn test_missing_changes_nothing() {
        let (mut board, mut economy) = setup(1);
        let mut progress = GateProgress::new();

        let outcome = complete_gate(
            &mut board,
            &catalog(),
            &mut economy,
            &mut progress,
            &order(GateKind::Task),
        )
        .unwrap();
        assert!(matches!(outcome, GateOutcome::Missing(_)));
        assert_eq!(board.len(), 1);
        assert_eq!(economy.coins(), 15);
        assert!(!progress.is_completed("first_bouquet"));
    }

    #[test]
    fn test_area_completes_once() {
        let (mut board, mut economy) = setup(4);
        economy.grant(Resource::Coins, 100);
        let mut progress = GateProgress::new();
        let gate = order(GateKind::Area);

        let first = complete_gate(&mut board, &catalog(), &mut economy, &mut progress, &gate);
        assert!(matches!(first, Ok(GateOutcome::Completed { .. })));
        let second = complete_gate(&mut board, &catalog(), &mut economy, &mut progress, &gate);
        assert_eq!(second, Ok(GateOutcome::AlreadyCompleted));
        assert_eq!(board.len(), 2);
    }

    #[test]
    fn test_task_repeats() {
        let (mut board, mut economy) = setup(4);
        economy.grant(Resource::Coins, 100);
        let mut progress = GateProgress::new();
        let gate = order(GateKind::Task);

        for _ in 0..2 {
            let outcome = complete_gate(&mut board, &catalog(), &mut economy, &mut progress, &gate);
            assert!(matches!(outcome, Ok(GateOutcome::Completed { .. })));
        }
        assert!(board.is_empty());
        assert_eq!(progress.times_completed("first_bouquet"), 2);
    }

    #[test]
    fn test_unknown_item_requirement() {
        let (board, economy) = setup(0);
        let gate = Gate {
            id: "bad".into(),
            kind: GateKind::Task,
            requirements: vec![Requirement::Items {
                item_type: ItemTypeId::new("ghost"),
                count: 1,
            }],
            reward: Reward::default(),
        };
        assert!(check_gate(&board, &catalog(), &economy, &GateProgress::new(), &gate).is_err());
    }
}
