//! Prompt sent to every provider.
//!
//! Downstream parsing only relies on the uppercase section markers, so both
//! providers must receive this exact template.

/// Section markers the response is expected to contain, in order
pub const SECTION_MARKERS: [&str; 5] = [
    "TITLE:",
    "ABSTRACT:",
    "DETAILED DESCRIPTION:",
    "CLAIMS:",
    "ENABLEMENT:",
];

const TEMPLATE: &str = r#"Generate a truly novel and innovative {domain} invention that would be worthy of patent protection. This should NOT be:
- A simple combination of existing technologies
- An obvious modification of existing products
- A general improvement without specific technical innovation

Instead, create an invention that:
1. Solves a real problem in a non-obvious way
2. Contains a surprising technical insight or mechanism
3. Has specific, novel technical features (not just "AI-powered" or "smart")
4. Includes concrete specifications (exact materials, dimensions, mechanisms, chemical formulas, algorithms, etc.)
5. Would not be obvious to someone skilled in the {domain} field

Think deeply about:
- What fundamental constraints or problems exist in this domain?
- What counter-intuitive approach might work?
- What specific mechanism or structure would enable this?
- What exact parameters or configurations make it work?

Provide in this format:

TITLE: [Specific, descriptive title that captures the core innovation]

ABSTRACT: [2-3 sentences explaining the problem, the non-obvious solution, and key benefit]

DETAILED DESCRIPTION: [Highly specific technical details including:
- Exact materials, alloys, compounds, or technologies (with specifications)
- Precise dimensions, ratios, temperatures, pressures, voltages, etc.
- Detailed structure, mechanism, or algorithm
- How different components interact at a technical level
- Why these specific choices enable the innovation (not just that they do)]

CLAIMS: [List 3-5 specific, technically novel aspects. Each claim should describe something that is:
1. Not obvious from prior art
2. Technically specific (not generic)
3. Essential to the invention's function]

ENABLEMENT: [Step-by-step instructions detailed enough for reproduction, including:
- Specific manufacturing or synthesis procedures
- Testing and calibration methods
- Operating parameters and conditions
- Troubleshooting tips
- Expected performance characteristics]
"#;

pub fn build_prompt(domain_name: &str) -> String {
    TEMPLATE.replace("{domain}", domain_name)
}

/// Markers missing from a completion, used for diagnostics only
pub fn missing_sections(raw: &str) -> Vec<&'static str> {
    SECTION_MARKERS
        .iter()
        .copied()
        .filter(|marker| !raw.contains(marker))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_every_marker() {
        let prompt = build_prompt("Biotechnology");
        assert!(missing_sections(&prompt).is_empty());
        assert!(prompt.contains("innovative Biotechnology invention"));
        assert!(!prompt.contains("{domain}"));
    }

    #[test]
    fn test_missing_sections() {
        let raw = "TITLE: Thing\nABSTRACT: short";
        assert_eq!(
            missing_sections(raw),
            vec!["DETAILED DESCRIPTION:", "CLAIMS:", "ENABLEMENT:"]
        );
    }
}
