use tutor_core::Subject;

const GENERAL: &[&str] = &[
    "Explain Ohm's law with a practical example",
    "How does a transistor work in electronics?",
    "What is a derivative in mathematics?",
    "How do you calculate the pH of a solution?",
    "What are Newton's laws of motion?",
    "Explain the principles of thermodynamics",
    "How do you solve a quadratic equation?",
    "What is electromotive force?",
];

/// Starter questions, narrowed to `subject` when one is given.
pub fn suggested_questions(subject: Option<Subject>) -> &'static [&'static str] {
    match subject {
        None => GENERAL,
        Some(Subject::Electrical) => &[
            "Explain Ohm's law",
            "How do you calculate electrical power?",
            "How do you apply Thevenin's method to a circuit?",
        ],
        Some(Subject::Mathematics) => &[
            "How do you compute a derivative?",
            "What is an integral?",
            "How do you solve an equation?",
        ],
        Some(Subject::Physics) => &[
            "Explain Newton's laws",
            "What is kinetic energy?",
            "How does thermodynamics work?",
        ],
        Some(Subject::Chemistry) => &[
            "How do you calculate the pH of a solution?",
            "What is a covalent bond?",
            "How do you balance a chemical reaction?",
        ],
        Some(Subject::Computing) => &[
            "What is recursion?",
            "How does a sorting algorithm work?",
            "What is a data structure?",
        ],
        Some(Subject::Biology) => &[
            "How does photosynthesis work?",
            "What does DNA encode?",
            "What do enzymes do?",
        ],
        Some(Subject::Unclassified) => &GENERAL[..3],
    }
}
