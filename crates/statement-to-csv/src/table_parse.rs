use std::collections::HashMap;

/// Splits a text line on tabs and on runs of two or more spaces.
pub(crate) fn split_line_into_cells(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut pending_space = false;

    let flush = |current: &mut String, cells: &mut Vec<String>| {
        let cell = current.trim();
        if !cell.is_empty() {
            cells.push(cell.to_string());
        }
        current.clear();
    };

    let mut chars = line.trim().chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\t' {
            flush(&mut current, &mut cells);
            pending_space = false;
        } else if ch.is_whitespace() {
            if chars.peek().is_some_and(|next| next.is_whitespace()) {
                flush(&mut current, &mut cells);
                pending_space = false;
                while chars.next_if(|next| next.is_whitespace() && *next != '\t').is_some() {}
            } else {
                pending_space = true;
            }
        } else {
            if pending_space {
                current.push(' ');
                pending_space = false;
            }
            current.push(ch);
        }
    }
    flush(&mut current, &mut cells);

    cells
}

pub(crate) fn soft_split_line_into_cells(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

pub(crate) fn pad_rows(rows: &[Vec<String>], width: usize) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            let mut padded = row.clone();
            padded.resize(width, String::new());
            padded
        })
        .collect()
}

/// Most common row width; ties go to the wider layout.
pub(crate) fn modal_width(rows: &[Vec<String>]) -> usize {
    let mut freq: HashMap<usize, usize> = HashMap::new();
    for row in rows {
        *freq.entry(row.len()).or_default() += 1;
    }

    freq.into_iter()
        .max_by_key(|&(width, count)| (count, width))
        .map_or(0, |(width, _)| width)
}
