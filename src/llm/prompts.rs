use crate::models::Decision;

/// Document text beyond this many characters is left out of the extraction prompt.
pub const MAX_PROMPT_TEXT_CHARS: usize = 15_000;

pub fn extraction_prompt(file_name: &str, raw_text: &str) -> String {
    let excerpt: String = raw_text.chars().take(MAX_PROMPT_TEXT_CHARS).collect();
    format!(
        r#"You are the assistant inside "Signal", a decision sensemaking tool.
The text below was extracted from a file named: {file_name}.

Break the document into short, atomic decision inputs of the kind a person would
add by hand (note, evidence, concern, assumption, question, link).

Rules:
- At most 240 characters per input, one idea per input.
- Every input must be grounded in the text. Anything implied but not stated is an assumption.
- No duplicates, no generic statements, no corporate filler.
- For long documents, list the most decision-relevant items first.
- Prefer inputs that bear on scope, user needs, constraints, success metrics and trade-offs.

Input types:
- "note": neutral observation or context
- "evidence": a claim backed by stated facts, metrics or findings
- "concern": a risk or potential downside
- "assumption": an unstated belief that would change the decision if wrong
- "question": missing information the decision needs
- "link": only when a URL appears in the text

DOCUMENT TEXT:
{excerpt}

Reply with JSON only, in exactly this shape:
{{
  "document_summary": "string",
  "inputs": [
    {{
      "type": "note|concern|evidence|assumption|question|link",
      "text": "string (max 240 chars)",
      "source_ref": "string",
      "confidence": "high|medium|low"
    }}
  ]
}}"#
    )
}

pub fn analysis_prompt(decision: &Decision) -> String {
    let input_log = if decision.inputs.is_empty() {
        "No inputs provided.".to_string()
    } else {
        decision
            .inputs
            .iter()
            .map(|input| {
                format!(
                    "[{}] {} (Source: {}): {}",
                    input.input_type.as_str().to_uppercase(),
                    input.author,
                    input.source_reference.as_deref().unwrap_or("Manual"),
                    input.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are Signal, a decision support assistant for product teams.
Analyze the decision below and its atomic inputs.

DECISION QUESTION: {title}
CONTEXT: {context}

INPUT LOG (manual notes and file extractions):
{input_log}

Instructions:
1. Surface conflicts between evidence and assumptions.
2. Do not recommend a side. Surface tensions and strategic stances.
3. Reference the author or source where relevant.
4. Be direct and product-friendly.

Reply with JSON only, in exactly this shape:
{{
  "situationSummary": "3-5 sentences",
  "whyHard": "2-4 sentences",
  "forces": ["string"],
  "constraints": ["string"],
  "hiddenAssumptions": ["string"],
  "unknowns": ["string"],
  "tensions": [
    {{"nameX": "string", "nameY": "string", "reasonX": "string", "reasonY": "string",
      "gainIfX": "string", "gainIfY": "string", "lossIfX": "string", "lossIfY": "string"}}
  ],
  "options": [
    {{"name": "string", "description": "string", "tradeoffs": "string",
      "commitmentDo": ["string"], "commitmentDont": ["string"], "futureImpact": "string"}}
  ],
  "fileExtractions": [
    {{"type": "Evidence|Assumption|Concern|Note|Question", "statement": "string",
      "source_citation": "string", "confidence": "High|Medium|Low"}}
  ]
}}"#,
        title = decision.title,
        context = decision.context,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DecisionStatus, InputItem, InputType};
    use chrono::NaiveDate;

    #[test]
    fn extraction_prompt_clips_document_text() {
        let text = format!("{}TAIL", "x".repeat(MAX_PROMPT_TEXT_CHARS));
        let prompt = extraction_prompt("plan.pdf", &text);
        assert!(prompt.contains("plan.pdf"));
        assert!(!prompt.contains("TAIL"));
        assert!(prompt.contains("\"document_summary\": \"string\""));
    }

    #[test]
    fn analysis_prompt_lists_inputs_with_sources() {
        let decision = Decision {
            id: "d".into(),
            title: "Sunset the legacy API?".into(),
            context: "Enterprise pushback".into(),
            owner: "Ana".into(),
            deadline: NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
            status: DecisionStatus::Active,
            created_at: 0,
            inputs: vec![
                InputItem {
                    id: "1".into(),
                    input_type: InputType::Evidence,
                    content: "40% of calls hit v1".into(),
                    author: "File: usage.csv".into(),
                    timestamp: 1,
                    source_reference: Some("Row 12".into()),
                    confidence: None,
                },
                InputItem {
                    id: "2".into(),
                    input_type: InputType::Concern,
                    content: "Churn risk".into(),
                    author: "Product Lead".into(),
                    timestamp: 2,
                    source_reference: None,
                    confidence: None,
                },
            ],
            files: vec![],
            ai_analysis: None,
            last_analysis_update: None,
        };

        let prompt = analysis_prompt(&decision);
        assert!(prompt.contains("DECISION QUESTION: Sunset the legacy API?"));
        assert!(prompt.contains("[EVIDENCE] File: usage.csv (Source: Row 12): 40% of calls hit v1"));
        assert!(prompt.contains("[CONCERN] Product Lead (Source: Manual): Churn risk"));
    }
}
