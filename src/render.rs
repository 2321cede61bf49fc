//! Plain-text board rendering for terminals and logs.

#![allow(clippy::format_push_string)]

use std::collections::{BTreeMap, BTreeSet};

use crate::game::{Board, Coord, Economy, ItemCatalog, ItemTypeId};

/// Short cell code for an item type: its first two letters plus tier,
/// e.g. `fl3` for `flower_3`. Unknown types render as `??`.
#[must_use]
pub fn cell_code(catalog: &ItemCatalog, item_type: &ItemTypeId) -> String {
    let Some(def) = catalog.get(item_type) else {
        return "??".to_owned();
    };
    let prefix: String = item_type
        .as_str()
        .chars()
        .filter(char::is_ascii_alphabetic)
        .take(2)
        .collect();
    format!("{prefix}{}", def.tier)
}

/// Cell codes for every type on the board.
///
/// Types sharing a [`cell_code`] get a letter suffix in id order
/// (`fl1a`, `fl1b`); past `z` the full type id is used.
fn board_codes(board: &Board, catalog: &ItemCatalog) -> BTreeMap<ItemTypeId, String> {
    let mut by_code: BTreeMap<String, BTreeSet<ItemTypeId>> = BTreeMap::new();
    for item in board.iter() {
        by_code
            .entry(cell_code(catalog, &item.item_type))
            .or_default()
            .insert(item.item_type.clone());
    }

    let mut codes = BTreeMap::new();
    for (code, types) in by_code {
        if types.len() == 1 {
            codes.extend(types.into_iter().map(|t| (t, code.clone())));
            continue;
        }
        for (i, item_type) in types.into_iter().enumerate() {
            let code = match u8::try_from(i).ok().filter(|&i| i < 26) {
                Some(i) => format!("{code}{}", char::from(b'a' + i)),
                None => item_type.to_string(),
            };
            codes.insert(item_type, code);
        }
    }
    codes
}

/// Render the board as an ASCII grid followed by a legend.
///
/// ```text
///      0    1    2
///   0  ro1  .    .
///   1  .    fl1  fl1
///
/// fl1 = flower_1 (x2)
/// ro1 = rock (x1)
/// ```
///
/// Generators and their remaining charges are listed after the legend.
#[must_use]
pub fn render_board(board: &Board, catalog: &ItemCatalog) -> String {
    let mut output = String::new();

    output.push_str("    ");
    for x in 0..board.width() {
        output.push_str(&format!(" {x:<4}"));
    }
    output.truncate(output.trim_end().len());
    output.push('\n');

    let codes = board_codes(board, catalog);
    let mut legend: BTreeMap<&str, (&ItemTypeId, usize)> = BTreeMap::new();
    for y in 0..board.height() {
        output.push_str(&format!("{y:>3} "));
        for x in 0..board.width() {
            let cell = match board
                .item_at(Coord::new(x, y))
                .and_then(|item| codes.get_key_value(&item.item_type))
            {
                Some((item_type, code)) => {
                    legend.entry(code.as_str()).or_insert((item_type, 0)).1 += 1;
                    code.as_str()
                }
                None => ".",
            };
            output.push_str(&format!(" {cell:<4}"));
        }
        output.truncate(output.trim_end().len());
        output.push('\n');
    }

    if !legend.is_empty() {
        output.push('\n');
    }
    for (code, (item_type, count)) in &legend {
        output.push_str(&format!("{code} = {item_type} (x{count})\n"));
    }

    let generators: Vec<_> = board
        .iter_row_major()
        .filter_map(|item| item.generator.map(|state| (item, state)))
        .collect();
    if !generators.is_empty() {
        output.push_str("\nGenerators:\n");
        for (item, state) in generators {
            output.push_str(&format!(
                "- {} at {}: {} charges\n",
                item.item_type, item.position, state.charges
            ));
        }
    }

    output
}

/// One-line economy summary.
#[must_use]
pub fn render_economy(economy: &Economy) -> String {
    format!(
        "Level {} ({}/{} xp) | Energy {}/{} | Coins {} | Gems {}",
        economy.level(),
        economy.xp(),
        economy.xp_threshold(),
        economy.energy(),
        economy.max_energy(),
        economy.coins(),
        economy.gems()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Category, EconomyConfig, GridConfig, ItemDefinition};

    fn catalog() -> ItemCatalog {
        let def = |id: &str, tier: u32| ItemDefinition {
            id: ItemTypeId::new(id),
            tier,
            category: Category::ConsumablePlant,
            merge_target: None,
            generator: None,
            chest: None,
            coin_value: 0,
            xp_value: 0,
            clears_on_merge: false,
        };
        ItemCatalog::from_definitions(vec![def("flower_1", 1), def("flour_1", 1), def("rock", 1)])
            .unwrap()
    }

    #[test]
    fn test_cell_code() {
        let catalog = catalog();
        assert_eq!(cell_code(&catalog, &ItemTypeId::new("flower_1")), "fl1");
        assert_eq!(cell_code(&catalog, &ItemTypeId::new("ghost")), "??");
    }

    #[test]
    fn test_render_board() {
        let mut board = Board::new(GridConfig::new(2, 3)).unwrap();
        board
            .spawn(ItemTypeId::new("rock"), Coord::new(0, 0), None)
            .unwrap();
        board
            .spawn(ItemTypeId::new("flower_1"), Coord::new(1, 1), None)
            .unwrap();
        board
            .spawn(ItemTypeId::new("flower_1"), Coord::new(2, 1), None)
            .unwrap();

        let text = render_board(&board, &catalog());
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[1], "  0  ro1  .    .");
        assert_eq!(lines[2], "  1  .    fl1  fl1");
        assert!(text.contains("fl1 = flower_1 (x2)"));
        assert!(text.contains("ro1 = rock (x1)"));
        assert!(!text.contains("Generators"));
    }

    #[test]
    fn test_render_board_disambiguates_shared_codes() {
        let mut board = Board::new(GridConfig::new(1, 3)).unwrap();
        board
            .spawn(ItemTypeId::new("flower_1"), Coord::new(0, 0), None)
            .unwrap();
        board
            .spawn(ItemTypeId::new("flour_1"), Coord::new(1, 0), None)
            .unwrap();
        board
            .spawn(ItemTypeId::new("flower_1"), Coord::new(2, 0), None)
            .unwrap();

        let text = render_board(&board, &catalog());
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[1], "  0  fl1b fl1a fl1b");
        assert!(text.contains("fl1a = flour_1 (x1)"));
        assert!(text.contains("fl1b = flower_1 (x2)"));
    }

    #[test]
    fn test_render_economy() {
        let economy = Economy::new(EconomyConfig::default(), 0);
        assert_eq!(
            render_economy(&economy),
            "Level 1 (0/50 xp) | Energy 100/100 | Coins 0 | Gems 0"
        );
    }
}
