use std::str::FromStr;

use crate::error::ErrorCode;

/// Offset based paging. The offset of the first row is 0; an absent limit
/// returns every remaining row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageRequest {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        PageRequest { limit, offset }
    }

    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0) as usize
    }

    pub fn limit(&self) -> usize {
        self.limit.map(|l| l as usize).unwrap_or(usize::MAX)
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset())
            .take(self.limit())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = ErrorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(ErrorCode::UnsupportedSortDirectionValue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_skips_and_limit_caps() {
        let rows: Vec<u32> = (0..22).collect();
        let page = PageRequest::new(Some(20), Some(10)).apply(rows);
        assert_eq!(page.len(), 12);
        assert_eq!(page[0], 10);
    }

    #[test]
    fn defaults_return_everything() {
        let rows: Vec<u32> = (0..21).collect();
        assert_eq!(PageRequest::default().apply(rows).len(), 21);
    }

    #[test]
    fn sort_direction_rejects_typos() {
        assert_eq!("DESC".parse::<SortDirection>(), Ok(SortDirection::Desc));
        assert_eq!(
            "asce".parse::<SortDirection>(),
            Err(ErrorCode::UnsupportedSortDirectionValue)
        );
    }
}
