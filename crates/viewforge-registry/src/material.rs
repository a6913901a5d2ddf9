//! Hardness / harvest-tool lookup for vanilla block states.
//!
//! Grounded on `pickaxe-data`'s hardcoded `match name { ... }` tables
//! (`food_properties`, `fuel_burn_time`): this repo carries no PrismarineJS
//! codegen pipeline, so vanilla material facts are a small static table
//! rather than a generated one.

/// Returns `(hardness, harvest_tools)` for a vanilla block name
/// (e.g. `"minecraft:stone"`), or `None` if the name is unknown to the
/// table (treated as unbreakable by `ViewBlockData::hardness`).
pub fn lookup(name: &str) -> Option<(f64, &'static [&'static str])> {
    let short = name.rsplit(':').next().unwrap_or(name);
    let entry = match short {
        "air" | "cave_air" | "void_air" => (0.0, &[][..]),
        "stone" | "andesite" | "diorite" | "granite" => (1.5, &["pickaxe"][..]),
        "cobblestone" => (2.0, &["pickaxe"][..]),
        "dirt" | "grass_block" | "sand" | "gravel" => (0.5, &[][..]),
        "bedrock" | "barrier" => (-1.0, &[][..]),
        "oak_log" | "spruce_log" | "birch_log" | "oak_planks" => (2.0, &["axe"][..]),
        "coal_ore" | "iron_ore" | "copper_ore" => (3.0, &["pickaxe"][..]),
        "gold_ore" | "redstone_ore" | "lapis_ore" => (3.0, &["pickaxe"][..]),
        "diamond_ore" | "emerald_ore" => (3.0, &["pickaxe"][..]),
        "obsidian" => (50.0, &["pickaxe"][..]),
        "glass" => (0.3, &[][..]),
        _ => return None,
    };
    Some(entry)
}

/// `-1.0` (as produced by `lookup`) means "unbreakable": no finite
/// `full_break_ms` exists for the block.
pub fn is_unbreakable(hardness: f64) -> bool {
    hardness < 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_material_resolves() {
        let (hardness, tools) = lookup("minecraft:stone").unwrap();
        assert_eq!(hardness, 1.5);
        assert_eq!(tools, &["pickaxe"]);
    }

    #[test]
    fn unknown_material_is_none() {
        assert!(lookup("minecraft:totally_made_up").is_none());
    }

    #[test]
    fn bedrock_is_unbreakable() {
        let (hardness, _) = lookup("minecraft:bedrock").unwrap();
        assert!(is_unbreakable(hardness));
    }
}
