//! Closed directive axes for the study-plan generator.
//!
//! Each axis is a closed enum with a total mapping to one fixed instruction
//! sentence. The match expressions are exhaustive, so adding a variant
//! without an instruction is a compile error rather than a silent default.

use serde::Deserialize;

/// How close the exam is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// The exam is imminent; optimize for rapid memorization.
    Cram,
    /// There is time for thorough study.
    Deep,
}

impl Urgency {
    /// Instruction sentence injected into the study-plan prompt.
    pub fn directive(self) -> &'static str {
        match self {
            Self::Cram => {
                "URGENT (Exam is Tomorrow). Prioritize the most frequently tested concepts \
                 and simplify explanations for rapid memorization. Skip fluff."
            }
            Self::Deep => {
                "Deep Study. Provide comprehensive, deeply technical, and nuance-heavy \
                 explanations."
            }
        }
    }
}

/// The grade the student is aiming for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetGrade {
    /// Bare minimum to clear the exam.
    Pass,
    /// Aiming for full marks.
    Top,
}

impl TargetGrade {
    /// Instruction sentence injected into the study-plan prompt.
    pub fn directive(self) -> &'static str {
        match self {
            Self::Pass => {
                "Focus purely on the absolute minimum core concepts required to just pass \
                 the exam."
            }
            Self::Top => {
                "Provide top-tier, exhaustive details aimed at scoring 100% in the exam."
            }
        }
    }
}

/// Register of the generated explanations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationStyle {
    /// Plain-language analogies over jargon.
    Simplified,
    /// Formal academic language throughout.
    Academic,
}

impl ExplanationStyle {
    /// Instruction sentence injected into the study-plan prompt.
    pub fn directive(self) -> &'static str {
        match self {
            Self::Simplified => {
                "Use extreme \"Explain Like I am 5\" (ELI5) analogies, simple language, and \
                 avoid dense jargon where possible."
            }
            Self::Academic => {
                "Use strictly formal academic language, industry-standard jargon, and highly \
                 rigorous technical definitions."
            }
        }
    }
}

/// Requested answer detail level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerLength {
    /// Crisp bullet-point answers.
    Short,
    /// Essay-length model answers.
    Long,
}

impl AnswerLength {
    /// Instruction sentence injected into the study-plan prompt.
    pub fn directive(self) -> &'static str {
        match self {
            Self::Short => {
                "Generate SHORT, punchy, crisp, 2-mark to 5-mark bullet points."
            }
            Self::Long => {
                "Generate VERY detailed, 10-mark essay length answers with complex \
                 multi-level structures, headings, and detailed examples."
            }
        }
    }
}

/// Fully resolved parameter set for one study-plan request.
///
/// `target_unit` advances monotonically across "continue" requests so the
/// plan is generated unit by unit.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct PlanDirectives {
    /// Exam proximity axis.
    pub urgency: Urgency,
    /// Target grade axis.
    pub target_grade: TargetGrade,
    /// Explanation style axis.
    pub explanation_style: ExplanationStyle,
    /// Answer detail axis.
    pub answer_length: AnswerLength,
    /// One-based unit index the generated plan must cover exclusively.
    pub target_unit: u32,
}
