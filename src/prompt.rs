use crate::neighborhood::NeighborhoodRecord;
use std::fmt::Write as _;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptProfile {
    /// Neighborhood-level specialist for Miami-Dade.
    #[default]
    Neighborhood,
    /// Wider South Florida scope (Miami-Dade, Broward, Palm Beach, Monroe).
    Regional,
}

impl FromStr for PromptProfile {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "neighborhood" => Ok(Self::Neighborhood),
            "regional" => Ok(Self::Regional),
            _ => Err(format!("unknown prompt profile '{value}'")),
        }
    }
}

impl PromptProfile {
    fn role_line(self) -> &'static str {
        match self {
            Self::Neighborhood => {
                "You are a climate risk analyst specializing in Miami-Dade neighborhoods. You explain flood, storm surge, heat and sea level rise risks to residents in clear, practical terms."
            }
            Self::Regional => {
                "You are a climate resilience advisor for South Florida, covering Miami-Dade, Broward, Palm Beach and Monroe counties. You explain regional climate hazards and adaptation options to residents, planners and businesses."
            }
        }
    }
}

const FORMATTING_GUIDELINES: &str = "Formatting guidelines:
- Use markdown headings (##) to separate major sections.
- Use bullet lists for risks and recommendations.
- Use a table when comparing several climate parameters.
- Bold the single most important takeaway.";

const RESPONSE_STYLE: &str = "Response style:
- Start with a one or two sentence direct answer.
- Keep the answer under 400 words unless the user asks for detail.
- Prefer concrete actions a resident can take.
- When data is uncertain, say so instead of guessing.";

const TECHNICAL_ACCURACY: &str = "Technical accuracy:
- Use feet for elevation and surge, inches for sea level rise.
- Refer to NOAA, FEMA flood zones and the Southeast Florida Regional Climate Compact projections where relevant.
- Do not invent statistics, addresses or program names.";

/// Builds the system instruction sent ahead of the user message.
///
/// Record fields are interpolated verbatim, so the dataset is trusted input.
pub fn compose_system_prompt(
    profile: PromptProfile,
    neighborhood: Option<&NeighborhoodRecord>,
) -> String {
    let mut prompt = format!(
        "{}\n\n{FORMATTING_GUIDELINES}\n\n{RESPONSE_STYLE}\n\n{TECHNICAL_ACCURACY}",
        profile.role_line()
    );

    if let Some(record) = neighborhood {
        push_neighborhood_block(&mut prompt, record);
    }

    prompt
}

fn push_neighborhood_block(prompt: &mut String, record: &NeighborhoodRecord) {
    // Writing to a String cannot fail.
    let _ = write!(
        prompt,
        "\n\nNeighborhood context for {}:\nDescription: {}\n",
        record.name, record.description
    );
    for (label, value) in record.climate_parameters.entries() {
        let _ = writeln!(prompt, "- {label}: {value}");
    }
    let _ = write!(
        prompt,
        "Vulnerability: {}\nSolutions: {}\n\nUse this data to tailor your answer specifically to {}, citing the parameters above where they are relevant.",
        record.vulnerability, record.solutions, record.name
    );
}
