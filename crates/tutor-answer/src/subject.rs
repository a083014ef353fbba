use tutor_core::text::{contains_phrase, tokens};
use tutor_core::Subject;

fn keywords(subject: Subject) -> &'static [&'static str] {
    match subject {
        Subject::Mathematics => &[
            "math", "mathematics", "derivative", "integral", "equation", "algebra", "calculus", "geometry",
            "matrix", "theorem", "polynomial", "probability", "quadratic", "logarithm", "vector space",
        ],
        Subject::Physics => &[
            "physics", "force", "newton", "gravity", "velocity", "acceleration", "momentum", "kinetic energy",
            "thermodynamics", "motion", "optics", "wave", "quantum",
        ],
        Subject::Chemistry => &[
            "chemistry", "ph", "acid", "molecule", "atom", "reaction", "chemical", "oxidation", "mole",
            "covalent", "periodic table",
        ],
        Subject::Electrical => &[
            "ohm", "voltage", "resistance", "resistor", "current", "circuit", "transistor", "capacitor",
            "electric", "electrical", "electronics", "thevenin", "diode", "inductor",
        ],
        Subject::Computing => &[
            "algorithm", "programming", "program", "code", "computer", "software", "database", "recursion",
            "sorting", "compiler", "data structure",
        ],
        Subject::Biology => &[
            "biology", "cell", "dna", "gene", "protein", "photosynthesis", "enzyme", "organism", "evolution",
        ],
        Subject::Unclassified => &[],
    }
}

/// File `query` under the first subject whose keyword set it hits.
pub fn detect_subject(query: &str) -> Subject {
    let words = tokens(query);
    Subject::CLASSIFIED
        .into_iter()
        .find(|s| keywords(*s).iter().any(|k| contains_phrase(&words, &tokens(k))))
        .unwrap_or(Subject::Unclassified)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_keyword() {
        assert_eq!(detect_subject("What is the derivative rule?"), Subject::Mathematics);
        assert_eq!(detect_subject("Explain Ohm's law"), Subject::Electrical);
        assert_eq!(detect_subject("How do enzymes work?"), Subject::Biology);
        assert_eq!(detect_subject("Compute the pH of vinegar"), Subject::Chemistry);
        assert_eq!(detect_subject("Tell me a story"), Subject::Unclassified);
    }

    #[test]
    fn earlier_subjects_win() {
        // hits both Physics (force) and Electrical (circuit)
        assert_eq!(detect_subject("force on a circuit"), Subject::Physics);
        assert_eq!(detect_subject("an algorithm for matrix inversion"), Subject::Mathematics);
    }

    #[test]
    fn keywords_match_whole_words_only() {
        assert_eq!(detect_subject("my phone is broken"), Subject::Unclassified);
    }
}
