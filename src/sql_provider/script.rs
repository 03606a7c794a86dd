//! The embedded catalog creation script and its batch splitter.

use std::path::Path;

pub const CREATE_DB_SCRIPT: &str = include_str!("../../sql/create_db.sql");

pub const DATABASE_NAME_PLACEHOLDER: &str = "[DATABASE_NAME]";
pub const DATABASE_FILE_PLACEHOLDER: &str = "[DATABASE_FILE]";

const BATCH_DELIMITER: &str = "GO";

/// Substitutes the catalog name and file into `script`.
///
/// The name must already be validated; the file path is escaped for use
/// inside a single-quoted SQL literal.
pub fn render(script: &str, database_name: &str, database_file: &Path) -> String {
    let file = database_file.to_string_lossy().replace('\'', "''");
    script
        .replace(DATABASE_NAME_PLACEHOLDER, database_name)
        .replace(DATABASE_FILE_PLACEHOLDER, &file)
}

fn is_delimiter(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(BATCH_DELIMITER)
}

/// Splits a script into batches on lines consisting only of `GO`.
///
/// Blank batches are dropped, text after the last delimiter is kept.
pub fn split_batches(script: &str) -> Vec<String> {
    let mut batches = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in script.lines() {
        if is_delimiter(line) {
            push_batch(&mut batches, &current);
            current.clear();
        } else {
            current.push(line);
        }
    }
    push_batch(&mut batches, &current);

    batches
}

fn push_batch(batches: &mut Vec<String>, lines: &[&str]) {
    let batch = lines.join("\n");
    if !batch.trim().is_empty() {
        batches.push(batch);
    }
}
