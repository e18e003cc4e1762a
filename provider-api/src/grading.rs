//! Best-effort extraction of a numeric rating (`X/5`) and a letter grade
//! (`A`-`F`, optional `+`/`-`) from free-text coach feedback.
//!
//! Nothing here fails: a miss is `None`. When only one of the two is found the
//! other is derived from it.

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub rating: Option<f32>,
    pub grade: Option<String>,
}

pub fn assess(text: &str) -> Assessment {
    let rating = extract_rating(text);
    let grade = extract_grade(text);

    return match (rating, grade) {
        (Some(rating), None) => Assessment {
            rating: Some(rating),
            grade: Some(grade_from_rating(rating).to_owned()),
        },
        (None, Some(grade)) => Assessment {
            rating: rating_from_grade(&grade),
            grade: Some(grade),
        },
        (rating, grade) => Assessment { rating, grade },
    };
}

pub fn extract_rating(text: &str) -> Option<f32> {
    // Dates such as 3/5/2024 are not ratings.
    let slash = Regex::new(r"(?:^|[^/\d.])(\d+(?:\.\d+)?)\s*/\s*5(?:\.0)?(?:[^/\d]|$)").ok()?;
    let out_of = Regex::new(r"(?i)(\d+(?:\.\d+)?)\s+out\s+of\s+5\b").ok()?;

    return slash
        .captures_iter(text)
        .chain(out_of.captures_iter(text))
        .filter_map(|x| x[1].parse::<f32>().ok())
        .find(|x| (0.0..=5.0).contains(x));
}

pub fn extract_grade(text: &str) -> Option<String> {
    let labelled = Regex::new(r"(?i:grade)\W{0,8}([A-DF][+\-]?)(?:\W|$)").ok()?;
    if let Some(captures) = labelled.captures(text) {
        return Some(captures[1].to_owned());
    }
    // A line holding nothing but the grade, e.g. "**B+**".
    let standalone = Regex::new(r"(?m)^[ \t*#_>\-]*([A-DF][+\-]?)[ \t*_]*$").ok()?;
    return standalone.captures(text).map(|x| x[1].to_owned());
}

fn rating_from_grade(grade: &str) -> Option<f32> {
    let base = match grade.chars().next()? {
        'A' => 5.0,
        'B' => 4.0,
        'C' => 3.0,
        'D' => 2.0,
        'F' => 1.0,
        _ => return None,
    };
    let adjusted: f32 = match grade.chars().nth(1) {
        Some('+') => base + 0.25,
        Some('-') => base - 0.25,
        _ => base,
    };
    return Some(adjusted.clamp(0.0, 5.0));
}

fn grade_from_rating(rating: f32) -> &'static str {
    return match rating {
        x if x >= 4.5 => "A",
        x if x >= 3.5 => "B",
        x if x >= 2.5 => "C",
        x if x >= 1.5 => "D",
        _ => "F",
    };
}

#[cfg(test)]
mod tests {
    use super::{assess, extract_grade, extract_rating};

    #[test]
    fn rating_patterns() {
        assert_eq!(extract_rating("Overall rating: 4/5."), Some(4.0));
        assert_eq!(extract_rating("Execution 3.5 / 5"), Some(3.5));
        assert_eq!(extract_rating("I'd give it 2 out of 5"), Some(2.0));
        assert_eq!(extract_rating("Risked 1/50 of the account, 3/5 overall"), Some(3.0));
        assert_eq!(extract_rating("no score here"), None);
    }

    #[test]
    fn dates_are_not_ratings() {
        assert_eq!(extract_rating("Entered on 3/5/2024 before the open"), None);
        assert_eq!(extract_rating("Session of 2024/3/5"), None);
        assert_eq!(extract_rating("Traded 3/5/2024. Rating: 4/5"), Some(4.0));
    }

    #[test]
    fn grade_patterns() {
        assert_eq!(extract_grade("Grade: B+"), Some("B+".to_owned()));
        assert_eq!(extract_grade("**Grade:** **A-** well done"), Some("A-".to_owned()));
        assert_eq!(extract_grade("Summary\n\n**C**\n\nMore text"), Some("C".to_owned()));
        assert_eq!(extract_grade("A great trade overall"), None);
        assert_eq!(extract_grade("grade E"), None);
    }

    #[test]
    fn derives_missing_half() {
        let from_rating = assess("Rating: 4.6/5");
        assert_eq!(from_rating.grade.as_deref(), Some("A"));

        let from_grade = assess("Grade: D");
        assert_eq!(from_grade.rating, Some(2.0));

        let nothing = assess("Keep journaling.");
        assert!(nothing.rating.is_none() && nothing.grade.is_none());
    }
}
