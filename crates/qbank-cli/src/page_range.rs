/// Parse a page selection like "1,3-5" or "20-" into sorted, deduplicated
/// 0-indexed page numbers.
///
/// Pages are 1-indexed on the command line. An open range ("20-") runs to the
/// last page and a leading open range ("-3") starts at the first.
pub fn parse_page_range(input: &str, page_count: usize) -> Result<Vec<usize>, String> {
    let mut pages = Vec::new();

    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (
                parse_bound(start, 1)?,
                parse_bound(end, page_count)?,
            ),
            None => {
                let page = parse_page(part)?;
                (page, page)
            }
        };

        if start == 0 || end == 0 {
            return Err("page 0 is invalid (pages start at 1)".to_string());
        }
        if start > end {
            return Err(format!("range {part} runs backwards"));
        }
        if end > page_count {
            return Err(format!("page {end} exceeds document page count ({page_count})"));
        }
        pages.extend((start..=end).map(|p| p - 1));
    }

    if pages.is_empty() {
        return Err(format!("no pages selected by '{input}'"));
    }
    pages.sort_unstable();
    pages.dedup();
    Ok(pages)
}

fn parse_bound(text: &str, open: usize) -> Result<usize, String> {
    let text = text.trim();
    if text.is_empty() {
        Ok(open)
    } else {
        parse_page(text)
    }
}

fn parse_page(text: &str) -> Result<usize, String> {
    text.trim()
        .parse()
        .map_err(|_| format!("invalid page number: '{}'", text.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_pages_and_ranges() {
        assert_eq!(parse_page_range("3", 5).unwrap(), vec![2]);
        assert_eq!(parse_page_range("1,3-5", 5).unwrap(), vec![0, 2, 3, 4]);
    }

    #[test]
    fn open_ranges() {
        assert_eq!(parse_page_range("20-", 22).unwrap(), vec![19, 20, 21]);
        assert_eq!(parse_page_range("-2", 22).unwrap(), vec![0, 1]);
    }

    #[test]
    fn overlapping_parts_are_merged() {
        assert_eq!(parse_page_range("2-4, 3, 1-2", 5).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn page_zero_invalid() {
        assert!(parse_page_range("0", 5).unwrap_err().contains("invalid"));
        assert!(parse_page_range("0-2", 5).unwrap_err().contains("invalid"));
    }

    #[test]
    fn backwards_range_rejected() {
        assert!(parse_page_range("5-2", 5).unwrap_err().contains("backwards"));
    }

    #[test]
    fn page_exceeds_count() {
        assert!(parse_page_range("6", 5).unwrap_err().contains("exceeds"));
        assert!(parse_page_range("4-9", 5).unwrap_err().contains("exceeds"));
    }

    #[test]
    fn garbage_rejected() {
        assert!(parse_page_range("two", 5).unwrap_err().contains("'two'"));
        assert!(parse_page_range(",,", 5).unwrap_err().contains("no pages"));
    }
}
