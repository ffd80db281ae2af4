//! Fixed prompts sent to the model.

/// Behavioral instructions of the troubleshooting conversation.
pub const TROUBLESHOOTER_INSTRUCTIONS: &str = "\
You are an expert PC Hardware Technician named 'FixMyRig Bot'.
Your goal is to help users diagnose and fix PC hardware issues.
Follow these rules:
1. Safety First: Always warn users about static electricity (ESD) and \
unplugging power before touching components.
2. Step-by-Step: Do not dump a wall of text. Ask clarifying questions to \
narrow down the problem (e.g., 'Does the fan spin?', 'Are there any beep \
codes?').
3. Be clear and concise. Use bullet points for instructions.
4. If the user mentions a specific part, explain what it does briefly if \
relevant to the fix.
5. Tone: Professional, encouraging, and tech-savvy.";

/// Prompt sent along with a component photo.
pub const INSPECTION_PROMPT: &str = "\
Analyze this image of a PC component.
1. Identify the component (e.g., GPU, Motherboard, RAM, PSU).
2. Inspect for any visible physical signs of damage such as:
   - Burnt capacitors or resistors (black marks).
   - Bent pins (especially on CPU sockets).
   - Dust buildup clogging fans/heatsinks.
   - Loose cables or improper seating.
3. If no damage is visible, describe the component and list its common \
failure symptoms.
4. Provide a maintenance tip for this specific component.

Format the response with clear headings.";

/// Builds the search prompt for a query. The query is embedded verbatim.
pub fn search_prompt(query: &str) -> String {
    format!(
        "Find official drivers, manuals, or recent forum solutions for: \
         {query}.\n\
         If it's a specific part, look for the manufacturer's support page.\n\
         Summarize the findings and explain why these links are relevant."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_prompt_keeps_query() {
        let prompt = search_prompt("ASUS B550-F  Manual");
        assert!(prompt.starts_with(
            "Find official drivers, manuals, or recent forum solutions for: \
             ASUS B550-F  Manual.\n"
        ));
    }
}
