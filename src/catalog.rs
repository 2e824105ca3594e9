//! Static reference data: the technique catalog and the prompt categories.

use serde::{Deserialize, Serialize};

/// A prompt-engineering technique from the reference catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Technique {
    pub name: &'static str,
    pub description: &'static str,
}

pub const TECHNIQUES: &[Technique] = &[
    Technique {
        name: "Zero-Shot Prompting",
        description: "Give the model a clear, direct instruction with no examples and rely on what it already knows.",
    },
    Technique {
        name: "Few-Shot Prompting",
        description: "Include a handful of worked input/output examples so the model infers the expected pattern and format.",
    },
    Technique {
        name: "Chain-of-Thought",
        description: "Ask the model to reason step by step before answering, which helps with multi-step logic and arithmetic.",
    },
    Technique {
        name: "Zero-Shot Chain-of-Thought",
        description: "Append a cue such as \"let's think step by step\" to trigger explicit reasoning without examples.",
    },
    Technique {
        name: "Persona Prompting",
        description: "Assign the model a role or expert identity so its tone, vocabulary and depth match that persona.",
    },
    Technique {
        name: "Self-Consistency",
        description: "Have the model produce several independent reasoning paths and settle on the answer they agree on.",
    },
    Technique {
        name: "Tree of Thoughts",
        description: "Explore multiple candidate ideas as branches, evaluate each, and expand only the promising ones.",
    },
    Technique {
        name: "ReAct (Reason + Act)",
        description: "Interleave reasoning steps with concrete actions or lookups, observing results before continuing.",
    },
    Technique {
        name: "PAL (Program-Aided Language Models) Prompting",
        description: "Have the model write a small program to compute the answer, ideal for math and precise calculations.",
    },
    Technique {
        name: "Generated Knowledge Prompting",
        description: "First ask the model to list relevant facts about the topic, then answer using that generated knowledge.",
    },
    Technique {
        name: "Least-to-Most Prompting",
        description: "Break a hard problem into simpler sub-problems and solve them in order, feeding each answer forward.",
    },
    Technique {
        name: "Step-Back Prompting",
        description: "Ask a higher-level question about the underlying principles first, then apply them to the specific task.",
    },
    Technique {
        name: "Prompt Chaining",
        description: "Split the task into a sequence of prompts where each output becomes the next prompt's input.",
    },
    Technique {
        name: "Self-Refine",
        description: "Have the model draft an answer, critique it against explicit criteria, and produce an improved revision.",
    },
    Technique {
        name: "Directional Stimulus Prompting",
        description: "Provide hints, keywords or cues that steer the model toward the desired content without dictating it.",
    },
    Technique {
        name: "Contrastive Prompting",
        description: "Show both good and bad examples so the model learns what to do and what to avoid.",
    },
    Technique {
        name: "Structured Output Prompting",
        description: "Specify an exact output format such as a table, JSON or headed sections to make results predictable.",
    },
    Technique {
        name: "Constraint Prompting",
        description: "State explicit limits on length, style, audience or scope so the answer stays focused.",
    },
    Technique {
        name: "Audience-Aware Prompting",
        description: "Describe who the output is for so the model adapts complexity, tone and examples to that reader.",
    },
    Technique {
        name: "Emotion Prompting",
        description: "Add stakes or emotional context that signals importance, which can raise effort and care in responses.",
    },
];

/// Look up a technique by its exact catalog name
pub fn technique(name: &str) -> Option<&'static Technique> {
    TECHNIQUES.iter().find(|t| t.name == name)
}

pub fn is_known_technique(name: &str) -> bool {
    technique(name).is_some()
}

/// Description for a technique name, or an empty string for unknown names
pub fn describe(name: &str) -> &'static str {
    technique(name).map(|t| t.description).unwrap_or("")
}

/// Case-insensitive search over technique names and descriptions.
/// An empty query returns the full catalog.
pub fn search_techniques(query: &str) -> Vec<&'static Technique> {
    let query = query.trim().to_lowercase();
    TECHNIQUES
        .iter()
        .filter(|t| {
            query.is_empty()
                || t.name.to_lowercase().contains(&query)
                || t.description.to_lowercase().contains(&query)
        })
        .collect()
}

/// Prompt category. Serialized as its display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    #[default]
    General,
    Writing,
    Programming,
    Research,
    Marketing,
    Education,
    Business,
    Creative,
    Productivity,
    Translation,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::General,
        Category::Writing,
        Category::Programming,
        Category::Research,
        Category::Marketing,
        Category::Education,
        Category::Business,
        Category::Creative,
        Category::Productivity,
        Category::Translation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::General => "General",
            Category::Writing => "Writing",
            Category::Programming => "Programming & Software Development",
            Category::Research => "Research & Data Analysis",
            Category::Marketing => "Marketing & Sales",
            Category::Education => "Education & Learning",
            Category::Business => "Business & Strategy",
            Category::Creative => "Creative & Art",
            Category::Productivity => "Productivity",
            Category::Translation => "Translation & Language",
        }
    }

    /// Exact label match; `None` for anything outside the fixed set
    pub fn from_label(label: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.label() == label)
    }

    pub fn labels() -> Vec<&'static str> {
        Category::ALL.iter().map(|c| c.label()).collect()
    }

    pub fn next(&self) -> Category {
        let idx = Category::ALL.iter().position(|c| c == self).unwrap_or(0);
        Category::ALL[(idx + 1) % Category::ALL.len()]
    }

    pub fn prev(&self) -> Category {
        let idx = Category::ALL.iter().position(|c| c == self).unwrap_or(0);
        Category::ALL[(idx + Category::ALL.len() - 1) % Category::ALL.len()]
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Category::from_label(&label).unwrap_or_default()
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.label().to_string()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
