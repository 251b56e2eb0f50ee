use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Name,
    Price,
    Stock,
}

impl SortField {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortField::Name => r#"LOWER(p.name) COLLATE "C""#,
            SortField::Price => "p.price",
            SortField::Stock => "p.stock",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Rows per page offered by the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PageSize {
    #[default]
    Ten,
    TwentyFive,
    Fifty,
    Hundred,
}

impl PageSize {
    pub fn get(&self) -> u32 {
        match self {
            PageSize::Ten => 10,
            PageSize::TwentyFive => 25,
            PageSize::Fifty => 50,
            PageSize::Hundred => 100,
        }
    }
}

impl TryFrom<u32> for PageSize {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            10 => Ok(PageSize::Ten),
            25 => Ok(PageSize::TwentyFive),
            50 => Ok(PageSize::Fifty),
            100 => Ok(PageSize::Hundred),
            other => Err(format!(
                "page size must be one of 10, 25, 50 or 100, got {}",
                other
            )),
        }
    }
}

impl From<PageSize> for u32 {
    fn from(size: PageSize) -> Self {
        size.get()
    }
}

/// Search, filter, sort and pagination state of one listing view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingState {
    pub search: String,
    pub category_id: Option<i32>,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub page_size: PageSize,
    pub page: u32,
}

impl Default for ListingState {
    fn default() -> Self {
        Self {
            search: String::new(),
            category_id: None,
            sort_field: SortField::default(),
            sort_direction: SortDirection::default(),
            page_size: PageSize::default(),
            page: 1,
        }
    }
}

impl ListingState {
    /// Returns true when the search text actually changed.
    pub fn set_search(&mut self, search: impl Into<String>) -> bool {
        let search = search.into();
        if self.search == search {
            return false;
        }
        self.search = search;
        self.page = 1;
        true
    }

    pub fn set_category(&mut self, category_id: Option<i32>) -> bool {
        if self.category_id == category_id {
            return false;
        }
        self.category_id = category_id;
        self.page = 1;
        true
    }

    /// Sorting by the current field flips the direction, any other field
    /// starts ascending.
    pub fn sort_by(&mut self, field: SortField) {
        if self.sort_field == field {
            self.sort_direction = self.sort_direction.toggled();
        } else {
            self.sort_field = field;
            self.sort_direction = SortDirection::Asc;
        }
        self.page = 1;
    }

    pub fn set_page_size(&mut self, page_size: PageSize) -> bool {
        if self.page_size == page_size {
            return false;
        }
        self.page_size = page_size;
        self.page = 1;
        true
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Back to the default search, category and sort. Page size is kept.
    pub fn clear_filters(&mut self) {
        self.search.clear();
        self.category_id = None;
        self.sort_field = SortField::default();
        self.sort_direction = SortDirection::default();
        self.page = 1;
    }

    pub fn search_term(&self) -> Option<&str> {
        let term = self.search.trim();
        if term.is_empty() { None } else { Some(term) }
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category_id) = self.category_id {
            if product.category_id != category_id {
                return false;
            }
        }

        match self.search_term() {
            None => true,
            Some(term) => {
                let needle = term.to_lowercase();
                product.name.to_lowercase().contains(&needle)
                    || product
                        .category_name
                        .as_deref()
                        .is_some_and(|name| name.to_lowercase().contains(&needle))
            }
        }
    }

    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let ordering = match self.sort_field {
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Price => a.price.cmp(&b.price),
            SortField::Stock => a.stock.cmp(&b.stock),
        };

        let ordering = match self.sort_direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };

        ordering.then_with(|| a.id.cmp(&b.id))
    }

    /// Runs the listing query over an in-memory set of records. Trashed
    /// records are ignored.
    pub fn apply<I>(&self, records: I) -> ListingPage
    where
        I: IntoIterator<Item = Product>,
    {
        let active: Vec<Product> = records.into_iter().filter(|p| !p.is_trashed()).collect();
        let total_count = active.len() as i64;

        let mut filtered: Vec<Product> = active.into_iter().filter(|p| self.matches(p)).collect();
        filtered.sort_by(|a, b| self.compare(a, b));

        ListingPage::slice(filtered, total_count, self.page, self.page_size)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingPage {
    pub items: Vec<Product>,
    pub total_count: i64,
    pub filtered_count: i64,
    pub page: u32,
    pub last_page: u32,
    pub page_size: u32,
}

impl ListingPage {
    pub fn empty(page_size: PageSize) -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            filtered_count: 0,
            page: 1,
            last_page: 1,
            page_size: page_size.get(),
        }
    }

    /// Cuts one page out of an already filtered and ordered set.
    pub fn slice(
        filtered: Vec<Product>,
        total_count: i64,
        requested_page: u32,
        page_size: PageSize,
    ) -> Self {
        let filtered_count = filtered.len() as i64;
        let last_page = last_page(filtered_count, page_size);
        let page = clamp_page(requested_page, filtered_count, page_size);

        let items = filtered
            .into_iter()
            .skip(offset(page, page_size) as usize)
            .take(page_size.get() as usize)
            .collect();

        Self {
            items,
            total_count,
            filtered_count,
            page,
            last_page,
            page_size: page_size.get(),
        }
    }

    pub fn ids(&self) -> Vec<i32> {
        self.items.iter().map(|p| p.id).collect()
    }
}

pub fn last_page(count: i64, page_size: PageSize) -> u32 {
    let size = i64::from(page_size.get());
    let pages = (count.max(0) + size - 1) / size;
    pages.max(1) as u32
}

pub fn clamp_page(requested: u32, count: i64, page_size: PageSize) -> u32 {
    requested.clamp(1, last_page(count, page_size))
}

pub fn offset(page: u32, page_size: PageSize) -> i64 {
    i64::from(page.max(1) - 1) * i64::from(page_size.get())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn product(id: i32, name: &str, price: i64, stock: i32, category_id: i32) -> Product {
        let now = Utc::now();
        Product {
            id,
            name: name.to_string(),
            price: Decimal::new(price, 0),
            stock,
            category_id,
            category_name: Some(format!("Category {}", category_id)),
            description: None,
            image_path: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn names(page: &ListingPage) -> Vec<&str> {
        page.items.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_filter_changes_reset_page() {
        let mut state = ListingState::default();

        state.set_page(4);
        assert!(state.set_search("phone"));
        assert_eq!(state.page, 1);

        state.set_page(4);
        assert!(state.set_category(Some(2)));
        assert_eq!(state.page, 1);

        state.set_page(4);
        state.sort_by(SortField::Price);
        assert_eq!(state.page, 1);

        state.set_page(4);
        assert!(state.set_page_size(PageSize::Fifty));
        assert_eq!(state.page, 1);
    }

    #[test]
    fn test_setting_same_value_is_not_a_change() {
        let mut state = ListingState::default();
        state.set_page(3);

        assert!(!state.set_search(""));
        assert!(!state.set_category(None));
        assert!(!state.set_page_size(PageSize::Ten));
        assert_eq!(state.page, 3);
    }

    #[test]
    fn test_sort_by_same_field_toggles_direction() {
        let mut state = ListingState::default();

        state.sort_by(SortField::Price);
        assert_eq!(state.sort_field, SortField::Price);
        assert_eq!(state.sort_direction, SortDirection::Asc);

        state.sort_by(SortField::Price);
        assert_eq!(state.sort_direction, SortDirection::Desc);

        state.sort_by(SortField::Stock);
        assert_eq!(state.sort_field, SortField::Stock);
        assert_eq!(state.sort_direction, SortDirection::Asc);
    }

    #[test]
    fn test_price_sort_orders_both_directions() {
        let records = vec![product(1, "A", 100, 1, 1), product(2, "B", 50, 1, 1)];
        let mut state = ListingState::default();

        state.sort_by(SortField::Price);
        assert_eq!(names(&state.apply(records.clone())), vec!["B", "A"]);

        state.sort_by(SortField::Price);
        assert_eq!(names(&state.apply(records)), vec!["A", "B"]);
    }

    #[test]
    fn test_search_counts() {
        let records = vec![
            product(1, "iPhone 15 Pro", 999, 5, 1),
            product(2, "Samsung Galaxy", 899, 5, 1),
        ];
        let mut state = ListingState::default();
        state.set_search("iphone");

        let page = state.apply(records);

        assert_eq!(names(&page), vec!["iPhone 15 Pro"]);
        assert_eq!(page.filtered_count, 1);
        assert_eq!(page.total_count, 2);
    }

    #[test]
    fn test_search_matches_category_name() {
        let mut drinks = product(1, "Cola", 2, 10, 7);
        drinks.category_name = Some("Beverages".to_string());
        let records = vec![drinks, product(2, "Bread", 3, 10, 8)];

        let mut state = ListingState::default();
        state.set_search("bever");

        assert_eq!(names(&state.apply(records)), vec!["Cola"]);
    }

    #[test]
    fn test_category_filter() {
        let records = vec![product(1, "Apple", 1, 1, 1), product(2, "Pear", 1, 1, 2)];
        let mut state = ListingState::default();
        state.set_category(Some(2));

        let page = state.apply(records);

        assert_eq!(names(&page), vec!["Pear"]);
        assert_eq!(page.total_count, 2);
    }

    #[test]
    fn test_trashed_records_are_not_listed() {
        let mut gone = product(1, "Gone", 1, 1, 1);
        gone.deleted_at = Some(Utc::now());
        let records = vec![gone, product(2, "Kept", 1, 1, 1)];

        let page = ListingState::default().apply(records);

        assert_eq!(names(&page), vec!["Kept"]);
        assert_eq!(page.total_count, 1);
    }

    #[test]
    fn test_ties_break_by_id() {
        let records = vec![
            product(3, "C", 10, 1, 1),
            product(1, "A", 10, 1, 1),
            product(2, "B", 10, 1, 1),
        ];
        let mut state = ListingState::default();
        state.sort_by(SortField::Price);

        let ids = state.apply(records).ids();

        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_names_differing_only_in_case_tie_by_id() {
        let records = vec![product(1, "apple", 1, 1, 1), product(2, "Apple", 1, 1, 1)];
        let mut state = ListingState::default();

        assert_eq!(state.apply(records.clone()).ids(), vec![1, 2]);

        state.sort_by(SortField::Name);
        assert_eq!(state.sort_direction, SortDirection::Desc);
        assert_eq!(state.apply(records).ids(), vec![1, 2]);
    }

    /// The order both stores must produce: the sort key in the chosen
    /// direction, then id ascending. Mirrors `ORDER BY <key> <dir>, p.id ASC`.
    #[test]
    fn test_ordering_contract() {
        let records = vec![
            product(4, "banana", 20, 3, 1),
            product(1, "Cherry", 10, 3, 1),
            product(3, "apple", 20, 1, 1),
            product(2, "Banana", 10, 2, 1),
        ];
        let cases = [
            (SortField::Name, SortDirection::Asc, vec![3, 2, 4, 1]),
            (SortField::Name, SortDirection::Desc, vec![1, 2, 4, 3]),
            (SortField::Price, SortDirection::Asc, vec![1, 2, 3, 4]),
            (SortField::Price, SortDirection::Desc, vec![3, 4, 1, 2]),
            (SortField::Stock, SortDirection::Asc, vec![3, 2, 1, 4]),
            (SortField::Stock, SortDirection::Desc, vec![1, 4, 2, 3]),
        ];

        for (field, direction, expected) in cases {
            let state = ListingState {
                sort_field: field,
                sort_direction: direction,
                ..ListingState::default()
            };
            assert_eq!(
                state.apply(records.clone()).ids(),
                expected,
                "{:?} {:?}",
                field,
                direction
            );
        }
    }

    #[test]
    fn test_sql_fragments() {
        assert_eq!(SortField::Name.as_sql(), r#"LOWER(p.name) COLLATE "C""#);
        assert_eq!(SortField::Price.as_sql(), "p.price");
        assert_eq!(SortField::Stock.as_sql(), "p.stock");
        assert_eq!(SortDirection::Asc.as_sql(), "ASC");
        assert_eq!(SortDirection::Desc.as_sql(), "DESC");
    }

    #[test]
    fn test_out_of_range_page_clamps_to_last() {
        let records: Vec<Product> = (1..=25)
            .map(|i| product(i, &format!("Item {:02}", i), 1, 1, 1))
            .collect();
        let mut state = ListingState::default();
        state.set_page(9);

        let page = state.apply(records);

        assert_eq!(page.page, 3);
        assert_eq!(page.last_page, 3);
        assert_eq!(page.items.len(), 5);
    }

    #[test]
    fn test_empty_result_is_first_page() {
        let mut state = ListingState::default();
        state.set_search("nothing matches");
        state.set_page(5);

        let page = state.apply(vec![product(1, "Apple", 1, 1, 1)]);

        assert!(page.items.is_empty());
        assert_eq!(page.page, 1);
        assert_eq!(page.last_page, 1);
        assert_eq!(page.filtered_count, 0);
        assert_eq!(page.total_count, 1);
    }

    #[test]
    fn test_page_size_accepts_only_offered_values() {
        assert_eq!(PageSize::try_from(25u32), Ok(PageSize::TwentyFive));
        assert!(PageSize::try_from(20u32).is_err());
        assert_eq!(
            serde_json::from_str::<PageSize>("100").ok(),
            Some(PageSize::Hundred)
        );
        assert!(serde_json::from_str::<PageSize>("7").is_err());
    }
}
