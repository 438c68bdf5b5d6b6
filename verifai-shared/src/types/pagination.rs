use serde::{Deserialize, Serialize};

const MAX_PAGE_SIZE: u32 = 100;

/// Zero-based page request for inbox listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    20
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    pub fn limit(&self) -> i64 {
        self.page_size.clamp(1, MAX_PAGE_SIZE) as i64
    }

    pub fn offset(&self) -> i64 {
        self.page as i64 * self.limit()
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 0, page_size: default_page_size() }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn offset_is_page_times_limit() {
        let page = PageRequest::new(3, 25);
        assert_eq!(page.limit(), 25);
        assert_eq!(page.offset(), 75);
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(PageRequest::new(0, 0).limit(), 1);
        assert_eq!(PageRequest::new(0, 500).limit(), 100);
        // offset follows the clamped size, not the requested one
        assert_eq!(PageRequest::new(2, 500).offset(), 200);
    }
}
