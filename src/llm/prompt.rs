//! Prompt assembly for the cardiac intervention analysis call.

use crate::records::CaseRecord;

/// Maximum number of CTA report characters included in a prompt.
const MAX_CTA_CHARS: usize = 2000;

/// Analysis prompt sent for each case record.
pub const ANALYSIS_PROMPT: &str = r#"
You are a cardiac intervention specialist. Based on the patient's clinical data and coronary CTA report,
please determine whether PCI (Percutaneous Coronary Intervention) is needed according to the latest
cardiovascular intervention guidelines before the patient's surgery date, and recommend the best treatment plan.
Please follow the process strictly:

**Patient Information**
Age: <age>{{AGE}}</age>
Gender: <gender>{{GENDER}}</gender>
Chief Complaint: <chief complaint>{{CHIEF COMPLAINT}}</chief complaint>
Present History: <present history>{{PRESENT HISTORY}}</present history>
Past History: <past history>{{PAST HISTORY}}</past history>
Surgery Date: <day>{{DAY}}</day>
Coronary CTA Report:
<CTA>
{{CORONARY_CTA}}
</CTA>

**Analysis Process**

1. Anatomical Feature Analysis (Required):
   - List in <analysis>:
     * Lesion Location (Left Main/LAD/LCX/RCA etc.)
     * Stenosis Degree (Percentage)
     * Lesion Type (A/B1/B2/C)
     * Special Features (Calcification/Thrombus/Bifurcation etc.)

2. Indication Assessment (Must cite guidelines):
   - Reference latest cardiovascular intervention guidelines before surgery date
     * Cite specific provisions (Format: "ESC NSTE-ACS Guidelines Chapter X Item Y")
   - Assess if meeting following indications:
     * Acute Coronary Syndrome
     * High-risk Chronic Coronary Syndrome
     * Significant Ischemic Evidence
     * Left Main Disease >=50%
     * Proximal LAD Stenosis >=70% etc.

3. Treatment Decision:
   - If PCI needed, select based on lesion characteristics (with reasons):
     * Balloon Dilation
     * Drug-Eluting Stent Implantation
     * Cutting Balloon
     * Drug-Coated Balloon

**Required Output Format**
<decision>
Treatment Decision: [1/0]
</decision>
<basis>
[Brief explanation based on specific guideline provisions]
</basis>
<recommendation>
Recommended Plan: [Specific procedure]
Based on: [Guideline name] Chapter [X]
Reason: [Combined with lesion characteristics]
</recommendation>
"#;

/// Render the analysis prompt for one case record.
///
/// The CTA report is truncated to [`MAX_CTA_CHARS`] characters to keep
/// prompts bounded for long imaging narratives.
pub fn render(record: &CaseRecord) -> String {
    let cta: String = record.cta_report.chars().take(MAX_CTA_CHARS).collect();

    ANALYSIS_PROMPT
        .replace("{{AGE}}", &record.age.to_string())
        .replace("{{GENDER}}", &record.sex)
        .replace("{{CHIEF COMPLAINT}}", &record.chief_complaint)
        .replace("{{PRESENT HISTORY}}", &record.present_history)
        .replace("{{PAST HISTORY}}", &record.past_history)
        .replace("{{DAY}}", &record.surgery_day)
        .replace("{{CORONARY_CTA}}", &cta)
}

/// Check a completion for the required response sections.
///
/// Returns the warning suffix to append when the `<decision>` or
/// `<recommendation>` sections are missing or left unclosed.
pub fn format_warning(content: &str) -> Option<&'static str> {
    let opening = ["<decision>", "<recommendation>"];
    let closing = ["</decision>", "</recommendation>"];

    if !opening.iter().all(|tag| content.contains(tag)) {
        Some("(Format Warning: Missing Required Tags)")
    } else if !closing.iter().all(|tag| content.contains(tag)) {
        Some("(Format Warning: Unclosed Tags)")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> CaseRecord {
        CaseRecord {
            index: 0,
            age: 64,
            sex: "M".to_string(),
            chief_complaint: "chest pain".to_string(),
            present_history: "two days of exertional angina".to_string(),
            past_history: "hypertension".to_string(),
            surgery_day: "2024-03-01".to_string(),
            cta_report: "LAD proximal 70% stenosis".to_string(),
        }
    }

    #[test]
    fn test_render_substitutes_all_fields() {
        let prompt = render(&sample_record());

        assert!(prompt.contains("<age>64</age>"));
        assert!(prompt.contains("<gender>M</gender>"));
        assert!(prompt.contains("chest pain"));
        assert!(prompt.contains("two days of exertional angina"));
        assert!(prompt.contains("hypertension"));
        assert!(prompt.contains("<day>2024-03-01</day>"));
        assert!(prompt.contains("LAD proximal 70% stenosis"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_render_truncates_long_cta() {
        let mut record = sample_record();
        record.cta_report = "x".repeat(5000);

        let prompt = render(&record);
        let cta_len = prompt.matches('x').count();
        assert_eq!(cta_len, MAX_CTA_CHARS);
    }

    #[test]
    fn test_format_warning_complete_response() {
        let content = "<decision>1</decision><basis>b</basis><recommendation>stent</recommendation>";
        assert_eq!(format_warning(content), None);
    }

    #[test]
    fn test_format_warning_missing_tags() {
        assert_eq!(
            format_warning("no structure at all"),
            Some("(Format Warning: Missing Required Tags)")
        );
    }

    #[test]
    fn test_format_warning_unclosed_tags() {
        let content = "<decision>1<recommendation>stent";
        assert_eq!(
            format_warning(content),
            Some("(Format Warning: Unclosed Tags)")
        );
    }
}
