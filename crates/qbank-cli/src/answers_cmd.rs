use std::path::Path;

use qbank_core::{Answer, QuestionId, reset_answers, set_answers};
use serde::Deserialize;

use crate::shared::{Context, load_bank, read_document, save_bank};

#[derive(Debug, Deserialize)]
struct AnswerEntry {
    id: QuestionId,
    answer: Answer,
}

/// Answers file: a bare JSON array, or a document with `[[answer]]` tables.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnswerFile {
    List(Vec<AnswerEntry>),
    Tables {
        #[serde(rename = "answer")]
        answers: Vec<AnswerEntry>,
    },
}

impl AnswerFile {
    fn into_pairs(self) -> Vec<(QuestionId, Answer)> {
        let entries = match self {
            AnswerFile::List(list) | AnswerFile::Tables { answers: list } => list,
        };
        entries.into_iter().map(|e| (e.id, e.answer)).collect()
    }
}

/// `--value` as typed: an option index, a number, or text.
fn parse_value(value: &str) -> Answer {
    let value = value.trim();
    if let Ok(index) = value.parse::<i64>() {
        Answer::Index(index)
    } else if let Ok(number) = value.parse::<f64>() {
        Answer::Value(number)
    } else {
        Answer::Text(value.to_string())
    }
}

pub fn run(
    bank: &Path,
    from: Option<&Path>,
    reset: bool,
    value: Option<&str>,
    ctx: &Context,
) -> Result<(), i32> {
    let mut exam = load_bank(bank)?;

    if reset {
        let value = value.map(parse_value);
        let count = reset_answers(&mut exam, value.clone());
        save_bank(bank, &exam, ctx)?;
        match value {
            Some(value) => println!("Set {count} answer(s) to {value}"),
            None => println!("Cleared {count} answer(s)"),
        }
        return Ok(());
    }

    let Some(from) = from else {
        eprintln!("Error: give --from FILE or --reset");
        return Err(1);
    };
    let answers = read_document::<AnswerFile>(from)?.into_pairs();
    let unmatched = set_answers(&mut exam, &answers);
    save_bank(bank, &exam, ctx)?;

    println!(
        "Set {} of {} answer(s)",
        answers.len() - unmatched.len(),
        answers.len()
    );
    for id in &unmatched {
        println!("  no question {id}");
    }
    Ok(())
}
