//! Prompt composition for the supported study tasks.
//!
//! Every composer follows the same shape: fixed task instructions, a
//! directive block resolved from closed parameter enums, a context block of
//! retrieved chunk contents joined by blank lines, and a task-specific
//! closing instruction. Context is truncated to a character budget *before*
//! it reaches a composer, always at a character boundary, so the schema
//! instructions that follow the context are never cut.
//!
//! Grounding discipline differs by task. Unit summaries and fixed-mark
//! answers are strict: the model must answer from the supplied context and
//! emit [`NOT_FOUND_MARKER`] where it cannot. Chat and exam-paper prompts
//! permit general-knowledge fallback, with a required disclosure note.

pub mod directives;

use serde::Deserialize;

use directives::PlanDirectives;

/// Marker the strict-grounding prompts require when context is insufficient.
pub const NOT_FOUND_MARKER: &str = "Not found in uploaded material.";

/// Placeholder rendered in place of an empty chat context block.
pub const NO_CHAT_CONTEXT: &str = "No document context found for this query.";

/// Placeholder rendered in place of an empty syllabus context block.
pub const NO_SYLLABUS_CONTEXT: &str = "(No syllabus context available)";

/// Exam-paper variants with fixed structural templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamKind {
    /// Mid-semester paper: descriptive section plus MCQs with an answer key.
    Mid,
    /// Full semester paper: unit-wise long answers plus one-mark shorts.
    Semester,
}

impl ExamKind {
    /// Canned retrieval query capturing what each paper variant needs.
    pub fn retrieval_query(self) -> &'static str {
        match self {
            Self::Mid => "important concepts and questions for mid semester examination",
            Self::Semester => {
                "comprehensive overview of all units and most important topics for final \
                 semester examination"
            }
        }
    }
}

/// Join retrieved chunk contents into one context block.
pub fn join_context<S: AsRef<str>>(chunks: &[S]) -> String {
    chunks
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Truncate a context block to at most `budget_chars` characters.
///
/// The cut always lands on a character boundary, never inside a code point.
pub fn truncate_context(context: &str, budget_chars: usize) -> &str {
    match context.char_indices().nth(budget_chars) {
        Some((byte_index, _)) => &context[..byte_index],
        None => context,
    }
}

fn context_or<'a>(context: &'a str, placeholder: &'a str) -> &'a str {
    if context.trim().is_empty() {
        placeholder
    } else {
        context
    }
}

/// System prompt for the open conversational tutor.
pub fn chat_system(context: &str) -> String {
    format!(
        "You are an expert academic tutor and exam preparation assistant.\n\
         Your absolute priority is to help the user prepare for their university exams effectively.\n\
         \n\
         STRICT RULES:\n\
         1. LONG ANSWERS: If the user asks for theory explanations, unit summaries, or 10-mark \
         questions, generate VERY LONG, IN-DEPTH, and DETAILED answers. A 10-mark question MUST \
         be at least 400-600 words long with headings and bullet points.\n\
         2. SYLLABUS PRIORITY: If a Syllabus or PYQ (Previous Year Questions) context is provided \
         below, you MUST cross-reference them to prioritize the most frequently mentioned or \
         heavily weighted topics first. Tell the student what is \"most expected\".\n\
         3. EXPECTED QUESTIONS: When asked for expected questions, provide exactly the requested \
         number of questions (both theory and MCQs) tailored to the provided context.\n\
         4. UNIT-WISE STUDY: If a syllabus is uploaded, break down preparation strictly \
         \"Unit-wise\", prioritizing the highest-yield units.\n\
         5. FALLBACK: If the provided text context does NOT contain the exact answer, you MUST \
         use your own general academically-correct knowledge to answer the question, but add a \
         brief note: \"*(Note: This was answered using general knowledge as it wasn't explicitly \
         found in your uploaded documents)*\".\n\
         6. Conversational but highly academic tone.\n\
         \n\
         UPLOADED KNOWLEDGE BASE CONTEXT:\n\
         {}",
        context_or(context, NO_CHAT_CONTEXT)
    )
}

/// Strict-grounding prompt for a comprehensive unit study summary.
pub fn unit_prep(unit: &str, context: &str) -> String {
    format!(
        "You are an academic assistant specializing in exam preparation for university students.\n\
         \n\
         STRICT INSTRUCTIONS:\n\
         - Use ONLY the information from the provided syllabus context. Do NOT use general \
         knowledge or add content not found in the context.\n\
         - If information for a section is missing, clearly write: \"{NOT_FOUND_MARKER}\"\n\
         - Answer should be detailed, focused, and avoid generic AI phrases, fluff, or \
         hallucinations.\n\
         - NO generalized, off-topic, or vague content.\n\
         \n\
         Prepare a comprehensive unit summary for the following UNIT: \"{unit}\".\n\
         \n\
         SYLLABUS CONTEXT:\n\
         {context}\n\
         \n\
         Provide the following, each section in clear headings:\n\
         \n\
         1. Unit Overview\n\
         2. Key Concepts\n\
         3. Expected 5-Mark Questions (with short academic sample question titles)\n\
         4. Expected 10-Mark Questions (with short academic sample question titles)\n\
         5. Important Topics\n\
         6. Quick Revision Points\n\
         \n\
         Keep each section directly tied to the context. If a section cannot be completed from \
         context, state \"{NOT_FOUND_MARKER}\" for that section.",
        context = context_or(context, NO_SYLLABUS_CONTEXT),
    )
}

/// Strict-grounding prompt answering a specific exam question for a fixed
/// mark weight.
pub fn question_answer(question: &str, marks: u32, context: &str) -> String {
    format!(
        "You are an academic assistant specializing in exam preparation for university students.\n\
         \n\
         STRICT INSTRUCTIONS:\n\
         - Use ONLY the information from the provided syllabus context. Do NOT use general \
         knowledge or add content not found in the context.\n\
         - If information for part of the answer is missing, clearly write: \"{NOT_FOUND_MARKER}\"\n\
         - Answer should be detailed, focused, and avoid generic AI phrases, fluff, or \
         hallucinations.\n\
         - NO generalized, off-topic, or vague content.\n\
         \n\
         SYLLABUS CONTEXT:\n\
         {context}\n\
         \n\
         EXAM QUESTION (worth {marks} marks):\n\
         \"{question}\"\n\
         \n\
         Write a high-quality answer appropriate for an exam worth {marks} marks.\n\
         - Structure the answer clearly.\n\
         - Focus only on content supported by the context.",
        context = context_or(context, NO_SYLLABUS_CONTEXT),
    )
}

fn exam_common(context: &str) -> String {
    format!(
        "You are an academic exam-preparation assistant for university students.\n\
         \n\
         STRICT RULES:\n\
         - Use the provided syllabus context as the primary source.\n\
         - If the context is insufficient for a question/answer, you MAY use academically \
         correct general knowledge to fill gaps.\n\
         - Do NOT use generic AI phrases (e.g., \"As an AI...\", \"I hope this helps...\").\n\
         - Keep formatting structured with clear headings and numbering.\n\
         - Keep language formal and exam-oriented.\n\
         \n\
         SYLLABUS CONTEXT:\n\
         {}",
        context_or(context, NO_SYLLABUS_CONTEXT)
    )
}

/// Prompt generating a full exam paper in one of the fixed structures.
pub fn exam_paper(kind: ExamKind, context: &str) -> String {
    let common = exam_common(context);
    match kind {
        ExamKind::Mid => format!(
            "{common}\n\
             \n\
             Generate a MID-SEMESTER exam preparation set with the following structure:\n\
             \n\
             ## Section A\n\
             - 2 questions of 5 marks each, with high-quality model answers.\n\
             - 1 question of 10 marks, with a high-quality model answer.\n\
             \n\
             ## Section B\n\
             - 10 MCQs. Each MCQ must have exactly 4 options (A, B, C, D).\n\
             - Provide an answer key for all MCQs.\n\
             \n\
             Output format must be:\n\
             \n\
             ### Mid-Semester Exam Preparation\n\
             #### Section A\n\
             Q1 (5 marks): <question>\n\
             Answer: <answer>\n\
             Q2 (5 marks): <question>\n\
             Answer: <answer>\n\
             Q3 (10 marks): <question>\n\
             Answer: <answer>\n\
             \n\
             #### Section B (MCQs)\n\
             1. <question>\n\
             \x20  A) ...\n\
             \x20  B) ...\n\
             \x20  C) ...\n\
             \x20  D) ...\n\
             ...\n\
             \n\
             #### Answer Key\n\
             1) A\n\
             2) C\n\
             ..."
        ),
        ExamKind::Semester => format!(
            "{common}\n\
             \n\
             Generate a SEMESTER exam preparation set with the following structure:\n\
             \n\
             ## Part 1: Unit-wise long answers\n\
             - Identify units from the syllabus context (use unit headings if present; \
             otherwise infer reasonable units based on the topics available).\n\
             - For EACH unit, generate 1 long-answer question (choose 5 or 10 marks \
             appropriately) with a high-quality model answer.\n\
             \n\
             ## Part 2: Short answers\n\
             - Generate 10 short 1-mark questions with crisp answers.\n\
             \n\
             Output format must be:\n\
             \n\
             ### Semester Exam Preparation\n\
             #### Unit-wise Long Answers\n\
             Unit 1: <unit title>\n\
             Q1 (<5 or 10> marks): <question>\n\
             Answer: <answer>\n\
             \n\
             Unit 2: <unit title>\n\
             Q2 (<5 or 10> marks): <question>\n\
             Answer: <answer>\n\
             ...\n\
             \n\
             #### 1-Mark Short Answers\n\
             1) <question> — <answer>\n\
             2) <question> — <answer>\n\
             ..."
        ),
    }
}

/// Prompt generating one unit of the parameterized study plan as strict JSON.
///
/// The directive block is resolved axis by axis, and the plan is pinned to
/// `directives.target_unit`: the model is told to cover that unit only, so
/// successive requests advance through the material without repeating or
/// anticipating other units.
pub fn study_plan(directives: &PlanDirectives, context: &str) -> String {
    let unit = directives.target_unit;
    let mut prompt = format!(
        "Act as an elite University Examiner and Master Tutor.\n\
         You are tasked with generating a high-yield, extremely rigorous Exam Study Plan based \
         on the provided parameter rules and context.\n\
         \n\
         USER EXAM PARAMETERS:\n\
         - Exam Proximity: {}\n\
         - Target Grade: {}\n\
         - Explanation Style: {}\n\
         - Desired Answer Detail: {}\n\
         - Plan Scope: Cover UNIT {unit} ONLY. Every hitlist question, summary, and flashcard \
         must come from UNIT {unit}; do not generate content for any other unit.\n\
         \n\
         SYLLABUS & DOCUMENT CONTEXT:\n\
         {}\n\
         \n\
         YOUR MISSION:\n\
         Analyze the context. You must generate an EXACT JSON object matching the schema below. \
         No markdown wrappers, no introductory text.\n\
         \n\
         REQUIREMENTS FOR QUALITY AND DYNAMIC FORMATTING:\n\
         1. DYNAMIC ANATOMY: The formatting of each Hitlist Answer MUST adapt to the specific \
         question being asked:\n\
         \x20  - If the question is about \"Differences\", \"Comparisons\", or \"Vs\", you MUST \
         use a Markdown Table.\n\
         \x20  - If the question is Mathematical, analytical, or algorithmic, you MUST use \
         step-by-step numbered logic and LaTeX-style code blocks for formulas.\n\
         \x20  - If the question is Architecture, Frameworks, or Processes, use bulleted lists \
         with bold headings.\n\
         2. Bold key terms and facts for grading visibility.\n\
         3. Every Hitlist Answer MUST end with a short \"Pro-Tip:\" or \"Mnemonic:\" to make it \
         extremely easy to remember on exam day.\n\
         \n\
         SCHEMA TO MATCH:\n",
        directives.urgency.directive(),
        directives.target_grade.directive(),
        directives.explanation_style.directive(),
        directives.answer_length.directive(),
        context_or(context, NO_SYLLABUS_CONTEXT),
    );

    prompt.push_str(
        "{\n\
         \x20 \"hitlist\": [\n\
         \x20   { \"q\": \"Question Text [10 Marks]\", \"a\": \"Highly professional, dynamically \
         structured answer containing tables/formulas if needed based on the question \
         taxonomy.\\n\\nPro-Tip: [Easy memory trick]\" }\n\
         \x20 ],\n\
         \x20 \"summaries\": [\n\
         \x20   { \"unit\": \"Unit Name\", \"text\": \"Rapid review paragraph.\" }\n\
         \x20 ],\n\
         \x20 \"flashcards\": [\n\
         \x20   { \"front\": \"Term\", \"back\": \"1 sentence definition.\" }\n\
         \x20 ]\n\
         }\n\
         \n\
         CONSTRAINT:\n\
         Generate EXACTLY 4 high-yield hitlist questions, 2 unit summaries, and 5 flashcards. \
         Do NOT exceed this quota; we need maximum speed. Ensure JSON is strictly valid.",
    );

    prompt
}
