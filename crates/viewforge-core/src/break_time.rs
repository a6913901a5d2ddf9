//! Computes `full_break_ms` as the product of base hardness, a pluggable
//! tool-speed modifier chain, and the fixed status-effect multiplier
//! (spec.md §4.5). Grounded on `calculate_break_ticks`
//! (`pickaxe-server::tick`), whose correct/incorrect-tool ratio
//! (`hardness * 1.5` vs `hardness * 5.0` seconds) is reproduced here as the
//! no-tool baseline times the default preferred-tool modifier's speedup.

use crate::host::BreakContext;

/// One link in the tool-speed modifier chain. Implementors inspect
/// `context` and contribute a multiplicative speed factor; the core ships
/// only the default preferred-tool modifier and otherwise leaves this
/// seam for a host to extend, matching the repository's existing
/// registry-of-modifiers shape.
pub trait ToolBreakSpeedModifier: Send + Sync {
    fn speed_multiplier(&self, material: &str, harvest_tools: &[String], context: &BreakContext) -> f64;
}

/// Applies the vanilla-shaped 1.5s/5.0s-per-hardness-point speedup when the
/// held tool is listed in the block's harvest tools.
pub struct PreferredToolModifier;

impl ToolBreakSpeedModifier for PreferredToolModifier {
    fn speed_multiplier(&self, _material: &str, harvest_tools: &[String], context: &BreakContext) -> f64 {
        if harvest_tools.is_empty() {
            return 1.0;
        }
        let holds_correct_tool = context
            .main_hand_tool
            .as_deref()
            .map(|tool| harvest_tools.iter().any(|t| t == tool))
            .unwrap_or(false);
        if holds_correct_tool {
            5.0 / 1.5
        } else {
            1.0
        }
    }
}

/// Base seconds-per-hardness-point with no tool held, matching the
/// teacher's incorrect-tool baseline (`hardness * 5.0` seconds).
const BASE_MS_PER_HARDNESS: f64 = 5.0 * 1000.0;

pub struct BreakTimeCalculator {
    modifiers: Vec<Box<dyn ToolBreakSpeedModifier>>,
}

impl Default for BreakTimeCalculator {
    fn default() -> Self {
        Self { modifiers: vec![Box::new(PreferredToolModifier)] }
    }
}

impl BreakTimeCalculator {
    pub fn new() -> Self {
        Self { modifiers: Vec::new() }
    }

    pub fn with_modifier(mut self, modifier: Box<dyn ToolBreakSpeedModifier>) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// `full_break_ms`, or `None` if `hardness` marks the block as
    /// unbreakable (negative hardness), in which case no dig can ever
    /// complete.
    pub fn full_break_ms(&self, hardness: f64, material: &str, harvest_tools: &[String], context: &BreakContext) -> Option<f64> {
        if hardness < 0.0 {
            return None;
        }
        if hardness == 0.0 {
            return Some(0.0);
        }
        let tool_speed: f64 = self
            .modifiers
            .iter()
            .map(|m| m.speed_multiplier(material, harvest_tools, context))
            .product::<f64>()
            .max(0.0001);
        let status_speed = context.status_speed_multiplier();
        Some(hardness * BASE_MS_PER_HARDNESS / (tool_speed * status_speed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hardness_breaks_instantly() {
        let calc = BreakTimeCalculator::default();
        let ctx = BreakContext::default();
        assert_eq!(calc.full_break_ms(0.0, "dirt", &[], &ctx), Some(0.0));
    }

    #[test]
    fn negative_hardness_is_unbreakable() {
        let calc = BreakTimeCalculator::default();
        let ctx = BreakContext::default();
        assert_eq!(calc.full_break_ms(-1.0, "bedrock", &[], &ctx), None);
    }

    #[test]
    fn correct_tool_is_faster_than_bare_hands() {
        let calc = BreakTimeCalculator::default();
        let ctx = BreakContext {
            main_hand_tool: Some("pickaxe".to_string()),
            ..Default::default()
        };
        let tools = vec!["pickaxe".to_string()];
        let with_tool = calc.full_break_ms(1.0, "stone", &tools, &ctx).unwrap();
        let bare = calc
            .full_break_ms(1.0, "stone", &tools, &BreakContext::default())
            .unwrap();
        assert!(with_tool < bare);
    }

    #[test]
    fn haste_speeds_up_break_time() {
        let calc = BreakTimeCalculator::default();
        let base_ctx = BreakContext::default();
        let haste_ctx = BreakContext { haste_level: 2, ..Default::default() };
        let base = calc.full_break_ms(1.0, "stone", &[], &base_ctx).unwrap();
        let hasted = calc.full_break_ms(1.0, "stone", &[], &haste_ctx).unwrap();
        assert!(hasted < base);
    }
}
