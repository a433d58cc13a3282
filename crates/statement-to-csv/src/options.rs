use std::collections::BTreeSet;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
    AutoDetect,
    HasHeader,
    NoHeader,
}

/// What to do with tables whose layout confidence is below the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityMode {
    /// Keep the table and attach a warning.
    BestEffort,
    /// Report the table as a per-table failure and skip it.
    Strict,
    /// Skip the table with a warning.
    SkipAmbiguous,
}

impl FromStr for QualityMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "best-effort" | "best_effort" => Ok(Self::BestEffort),
            "strict" => Ok(Self::Strict),
            "skip" | "skip-ambiguous" | "skip_ambiguous" => Ok(Self::SkipAmbiguous),
            other => Err(format!(
                "unknown quality mode '{other}', expected best-effort, strict or skip-ambiguous"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    pages: BTreeSet<u32>,
}

impl PageSelection {
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains(&page)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

fn parse_page_number(raw: &str, what: &str) -> Result<u32, String> {
    let page: u32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid {what}: '{}'", raw.trim()))?;
    if page == 0 {
        return Err("pages are 1-based".to_string());
    }
    Ok(page)
}

impl FromStr for PageSelection {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let mut pages = BTreeSet::new();
        for token in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match token.split_once('-') {
                Some((start, end)) => {
                    let start = parse_page_number(start, "page range start")?;
                    let end = parse_page_number(end, "page range end")?;
                    if end < start {
                        return Err(format!(
                            "invalid range '{token}': end is smaller than start"
                        ));
                    }
                    pages.extend(start..=end);
                }
                None => {
                    pages.insert(parse_page_number(token, "page number")?);
                }
            }
        }

        if pages.is_empty() {
            return Err("page selection cannot be empty".to_string());
        }

        Ok(Self { pages })
    }
}

/// Configuration handed to the text-layer table extractor.
///
/// `do_ocr` and `do_table_structure` mirror the two toggles a document
/// structure service exposes. Only text-layer extraction is available, so
/// `do_ocr` must stay `false`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    pub pages: Option<PageSelection>,
    pub delimiter: u8,
    pub header_mode: HeaderMode,
    pub quality_mode: QualityMode,
    pub min_cols: usize,
    pub do_ocr: bool,
    pub do_table_structure: bool,
    /// Directory used for staged input files. `None` uses the system temp dir.
    pub work_dir: Option<PathBuf>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            pages: None,
            delimiter: b',',
            header_mode: HeaderMode::AutoDetect,
            quality_mode: QualityMode::BestEffort,
            min_cols: 2,
            do_ocr: false,
            do_table_structure: true,
            work_dir: None,
        }
    }
}
