//! CSV form of the spine grid. A CSV-encoded Humdrum row is the tab row
//! with tabs replaced by a separator; fields containing the separator, or
//! beginning with a double quote, are quoted with doubled inner quotes.
//! Rows without spines (global comments, reference records, empty lines)
//! pass through untouched in both directions.

/// Translate one CSV row into a tab-separated row.
pub fn row_to_tsv(row: &str, separator: char) -> String {
    if row.is_empty() || row.starts_with("!!") {
        return row.to_string();
    }
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut chars = row.chars().peekable();
    let mut at_field_start = true;
    while let Some(ch) = chars.next() {
        if at_field_start && ch == '"' {
            // Quoted field: read to the closing quote, folding "" into ".
            loop {
                match chars.next() {
                    Some('"') => {
                        if chars.peek() == Some(&'"') {
                            chars.next();
                            field.push('"');
                        } else {
                            break;
                        }
                    }
                    Some(c) => field.push(c),
                    None => break,
                }
            }
            at_field_start = false;
        } else if ch == separator {
            fields.push(std::mem::take(&mut field));
            at_field_start = true;
        } else {
            field.push(ch);
            at_field_start = false;
        }
    }
    fields.push(field);
    fields.join("\t")
}

/// Quote one token for CSV emission.
pub fn field_to_csv(text: &str, separator: char) -> String {
    if text.contains(separator) || text.starts_with('"') {
        let mut out = String::with_capacity(text.len() + 2);
        out.push('"');
        for ch in text.chars() {
            if ch == '"' {
                out.push('"');
            }
            out.push(ch);
        }
        out.push('"');
        out
    } else {
        text.to_string()
    }
}
