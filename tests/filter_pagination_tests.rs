use admin_console::{
    filter::FilterState,
    models::{Page, WirePagination, total_pages},
    table::{PageButton, PaginationView},
};

fn params(filter: &FilterState) -> Vec<(String, String)> {
    filter.to_query_params()
}

fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
    list.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// --- FilterState ---

#[test]
fn test_new_filter_starts_on_page_one() {
    let filter = FilterState::new(20);
    assert_eq!(filter.page(), 1);
    assert_eq!(filter.page_size(), 20);
    assert_eq!(filter.search(), None);
    assert!(filter.fields().is_empty());
    assert_eq!(params(&filter), pairs(&[("page", "1"), ("limit", "20")]));
}

#[test]
fn test_search_resets_page_and_is_trimmed() {
    let filter = FilterState::new(20).with_page(4).with_search("  alice ");
    assert_eq!(filter.page(), 1);
    assert_eq!(filter.search(), Some("alice"));
    assert_eq!(
        params(&filter),
        pairs(&[("page", "1"), ("limit", "20"), ("search", "alice")])
    );
}

#[test]
fn test_blank_search_is_omitted() {
    let filter = FilterState::new(20).with_search("alice").with_search("   ");
    assert_eq!(filter.search(), None);
    assert!(!params(&filter).iter().any(|(k, _)| k == "search"));
}

#[test]
fn test_field_filter_resets_page_and_empty_value_clears() {
    let filter = FilterState::new(10)
        .with_page(3)
        .with_field("status", "active");
    assert_eq!(filter.page(), 1);
    assert_eq!(filter.field("status"), Some("active"));

    let filter = filter.with_page(2).with_field("role", "admin");
    assert_eq!(
        params(&filter),
        pairs(&[
            ("page", "1"),
            ("limit", "10"),
            ("role", "admin"),
            ("status", "active"),
        ])
    );

    let filter = filter.with_field("status", "");
    assert_eq!(filter.field("status"), None);
    assert_eq!(filter.field("role"), Some("admin"));
}

#[test]
fn test_page_change_keeps_filters() {
    let filter = FilterState::new(20)
        .with_search("bob")
        .with_field("status", "banned")
        .with_page(3);
    assert_eq!(filter.page(), 3);
    assert_eq!(filter.search(), Some("bob"));
    assert_eq!(filter.field("status"), Some("banned"));

    // Never below page 1.
    assert_eq!(filter.with_page(0).page(), 1);
}

#[test]
fn test_cleared_and_clamped() {
    let filter = FilterState::new(20)
        .with_search("x")
        .with_field("status", "active")
        .with_page(7);

    let cleared = filter.cleared();
    assert_eq!(cleared, FilterState::new(20));

    assert_eq!(filter.clamped(3).page(), 3);
    assert_eq!(filter.clamped(10).page(), 7);
    assert_eq!(filter.with_search_reset().search(), None);
}

// --- Page math ---

#[test]
fn test_total_pages_is_ceiling() {
    assert_eq!(total_pages(0, 20), 0);
    assert_eq!(total_pages(1, 20), 1);
    assert_eq!(total_pages(20, 20), 1);
    assert_eq!(total_pages(21, 20), 2);
    assert_eq!(total_pages(95, 20), 5);
    assert_eq!(total_pages(10, 0), 0);
}

#[test]
fn test_total_pages_saturates() {
    assert_eq!(total_pages(u64::MAX, 1), u32::MAX);
    assert_eq!(total_pages(u64::from(u32::MAX) + 1, 1), u32::MAX);
    assert_eq!(total_pages(u64::from(u32::MAX), 1), u32::MAX);
    assert_eq!(total_pages(u64::from(u32::MAX) * 2, 2), u32::MAX);
}

#[test]
fn test_page_from_wire_uses_server_numbers() {
    let page = Page::from_wire(
        vec!["a", "b"],
        Some(WirePagination {
            page: 2,
            pages: 3,
            total: 42,
            limit: 20,
        }),
        2,
        20,
    );
    assert_eq!(page.page, 2);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.total_items, 42);
}

#[test]
fn test_page_from_wire_derives_missing_pages() {
    let page = Page::from_wire(
        vec![1, 2, 3],
        Some(WirePagination {
            total: 45,
            ..WirePagination::default()
        }),
        1,
        20,
    );
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.page, 1);
}

#[test]
fn test_unpaginated_collection_is_one_page() {
    let page = Page::from_wire(vec!["tech", "food"], None, 1, 20);
    assert_eq!(page.total_items, 2);
    assert_eq!(page.total_pages, 1);

    let empty: Page<&str> = Page::from_wire(Vec::new(), None, 1, 20);
    assert_eq!(empty.total_pages, 0);
}

// --- Pagination controls ---

#[test]
fn test_first_of_five_pages() {
    let view = PaginationView::build(1, 5);
    assert_eq!(view.labels(), vec!["Previous", "1", "2", "3", "Next"]);

    let previous = &view.buttons[0];
    assert!(previous.disabled);

    let current = &view.buttons[1];
    assert_eq!(
        current,
        &PageButton {
            label: "1".to_string(),
            target: 1,
            active: true,
            disabled: false,
        }
    );

    let next = view.buttons.last().unwrap();
    assert!(!next.disabled);
    assert_eq!(next.target, 2);
}

#[test]
fn test_window_is_centred_on_current_page() {
    assert_eq!(PaginationView::window(5, 10), 3..=7);
    assert_eq!(PaginationView::window(1, 10), 1..=3);
    assert_eq!(PaginationView::window(10, 10), 8..=10);
    assert_eq!(PaginationView::window(2, 2), 1..=2);

    let view = PaginationView::build(5, 10);
    assert_eq!(
        view.labels(),
        vec!["Previous", "3", "4", "5", "6", "7", "Next"]
    );
    assert_eq!(view.buttons[0].target, 4);
}

#[test]
fn test_last_page_disables_next() {
    let view = PaginationView::build(5, 5);
    assert_eq!(view.labels(), vec!["Previous", "3", "4", "5", "Next"]);
    assert!(!view.buttons[0].disabled);
    assert!(view.buttons.last().unwrap().disabled);
}

#[test]
fn test_single_page_and_no_pages() {
    let view = PaginationView::build(1, 1);
    assert_eq!(view.labels(), vec!["Previous", "1", "Next"]);
    assert!(view.buttons[0].disabled);
    assert!(view.buttons[2].disabled);

    assert!(PaginationView::build(1, 0).buttons.is_empty());
}
