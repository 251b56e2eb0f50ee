mod common;

use std::time::Duration;

use catalog_admin::{
    error::AppError,
    models::{FlashKind, PageSize, SortDirection, SortField},
    services::{ListingController, ListingIntent, ListingSessions},
};
use common::{TestApp, admin, user};

async fn open(app: &TestApp) -> ListingController {
    ListingController::open(app.products(), &admin()).await.unwrap()
}

async fn apply(app: &TestApp, controller: &mut ListingController, intent: ListingIntent) {
    controller
        .apply(app.products(), &admin(), intent)
        .await
        .unwrap();
}

fn names(controller: &ListingController) -> Vec<String> {
    controller
        .page()
        .items
        .iter()
        .map(|p| p.name.clone())
        .collect()
}

#[tokio::test]
async fn test_filter_changes_reset_page_and_selection() {
    let app = TestApp::new().await;
    app.seed_many(25).await;
    let mut controller = open(&app).await;

    let intents = [
        ListingIntent::Search {
            value: "Item".to_string(),
        },
        ListingIntent::Category {
            category_id: Some(app.phones.id),
        },
        ListingIntent::SortBy {
            field: SortField::Stock,
        },
        ListingIntent::PageSize {
            page_size: PageSize::TwentyFive,
        },
    ];

    for intent in intents {
        apply(&app, &mut controller, ListingIntent::Page { page: 2 }).await;
        apply(
            &app,
            &mut controller,
            ListingIntent::ToggleSelectAll { checked: true },
        )
        .await;
        assert!(!controller.selection().is_empty());

        apply(&app, &mut controller, intent.clone()).await;

        assert_eq!(controller.state().page, 1, "{:?}", intent);
        assert!(controller.selection().is_empty(), "{:?}", intent);
        assert!(!controller.selection().select_all());
    }
}

#[tokio::test]
async fn test_repeating_a_filter_keeps_selection() {
    let app = TestApp::new().await;
    app.seed_many(3).await;
    let mut controller = open(&app).await;

    apply(
        &app,
        &mut controller,
        ListingIntent::Search {
            value: "Item".to_string(),
        },
    )
    .await;
    apply(
        &app,
        &mut controller,
        ListingIntent::ToggleSelectAll { checked: true },
    )
    .await;
    apply(
        &app,
        &mut controller,
        ListingIntent::Search {
            value: "Item".to_string(),
        },
    )
    .await;

    assert_eq!(controller.selection().len(), 3);
}

#[tokio::test]
async fn test_select_all_covers_exactly_the_current_page() {
    let app = TestApp::new().await;
    let products = app.seed_many(15).await;
    let mut controller = open(&app).await;

    apply(&app, &mut controller, ListingIntent::Page { page: 2 }).await;
    apply(
        &app,
        &mut controller,
        ListingIntent::ToggleSelectAll { checked: true },
    )
    .await;

    let expected: Vec<i32> = products[10..].iter().map(|p| p.id).collect();
    let selected: Vec<i32> = controller.selection().ids().iter().copied().collect();
    assert_eq!(selected, expected);
    assert!(controller.selection().select_all());

    apply(
        &app,
        &mut controller,
        ListingIntent::ToggleSelectAll { checked: false },
    )
    .await;
    assert!(controller.selection().is_empty());
    assert!(!controller.selection().select_all());
}

#[tokio::test]
async fn test_select_all_flag_tracks_page_navigation() {
    let app = TestApp::new().await;
    let products = app.seed_many(12).await;
    let mut controller = open(&app).await;

    apply(
        &app,
        &mut controller,
        ListingIntent::ToggleSelectAll { checked: true },
    )
    .await;
    apply(&app, &mut controller, ListingIntent::Page { page: 2 }).await;
    assert!(!controller.selection().select_all());

    for product in &products[10..] {
        apply(&app, &mut controller, ListingIntent::ToggleOne { id: product.id }).await;
    }
    assert!(controller.selection().select_all());
    assert_eq!(controller.selection().len(), 12);

    apply(
        &app,
        &mut controller,
        ListingIntent::ToggleOne {
            id: products[11].id,
        },
    )
    .await;
    assert!(!controller.selection().select_all());
}

#[tokio::test]
async fn test_toggle_ignores_products_off_the_page() {
    let app = TestApp::new().await;
    let products = app.seed_many(12).await;
    let mut controller = open(&app).await;

    apply(
        &app,
        &mut controller,
        ListingIntent::ToggleOne {
            id: products[11].id,
        },
    )
    .await;

    assert!(controller.selection().is_empty());
}

#[tokio::test]
async fn test_price_sort_toggles_direction() {
    let app = TestApp::new().await;
    app.seed("Product A", 100, 1, &app.phones).await;
    app.seed("Product B", 50, 1, &app.phones).await;
    let mut controller = open(&app).await;

    apply(
        &app,
        &mut controller,
        ListingIntent::SortBy {
            field: SortField::Price,
        },
    )
    .await;
    assert_eq!(names(&controller), vec!["Product B", "Product A"]);
    assert_eq!(controller.state().sort_direction, SortDirection::Asc);

    apply(
        &app,
        &mut controller,
        ListingIntent::SortBy {
            field: SortField::Price,
        },
    )
    .await;
    assert_eq!(names(&controller), vec!["Product A", "Product B"]);
    assert_eq!(controller.state().sort_direction, SortDirection::Desc);
}

#[tokio::test]
async fn test_search_reports_filtered_and_total_counts() {
    let app = TestApp::new().await;
    app.seed("iPhone 15 Pro", 999, 5, &app.phones).await;
    app.seed("Samsung Galaxy", 899, 5, &app.phones).await;
    let mut controller = open(&app).await;

    apply(
        &app,
        &mut controller,
        ListingIntent::Search {
            value: "iPhone".to_string(),
        },
    )
    .await;

    assert_eq!(names(&controller), vec!["iPhone 15 Pro"]);
    assert_eq!(controller.page().filtered_count, 1);
    assert_eq!(controller.page().total_count, 2);
}

#[tokio::test]
async fn test_category_filter_and_clear_filters() {
    let app = TestApp::new().await;
    app.seed("Pixel 9", 799, 2, &app.phones).await;
    app.seed("ThinkPad X1", 1899, 2, &app.laptops).await;
    let mut controller = open(&app).await;

    apply(
        &app,
        &mut controller,
        ListingIntent::PageSize {
            page_size: PageSize::Fifty,
        },
    )
    .await;
    apply(
        &app,
        &mut controller,
        ListingIntent::Category {
            category_id: Some(app.laptops.id),
        },
    )
    .await;
    apply(
        &app,
        &mut controller,
        ListingIntent::SortBy {
            field: SortField::Price,
        },
    )
    .await;
    assert_eq!(names(&controller), vec!["ThinkPad X1"]);

    apply(&app, &mut controller, ListingIntent::ClearFilters).await;

    assert_eq!(controller.state().category_id, None);
    assert_eq!(controller.state().sort_field, SortField::Name);
    assert_eq!(controller.state().page_size, PageSize::Fifty);
    assert_eq!(controller.page().filtered_count, 2);
}

#[tokio::test]
async fn test_page_beyond_end_clamps() {
    let app = TestApp::new().await;
    app.seed_many(25).await;
    let mut controller = open(&app).await;

    apply(&app, &mut controller, ListingIntent::Page { page: 40 }).await;

    assert_eq!(controller.state().page, 3);
    assert_eq!(controller.page().last_page, 3);
    assert_eq!(controller.page().items.len(), 5);
}

#[tokio::test]
async fn test_single_delete_flash_is_shown_once() {
    let app = TestApp::new().await;
    let product = app.seed("Pixel 9", 799, 2, &app.phones).await;
    let sessions = ListingSessions::default();

    let view = sessions.open(app.products(), &admin()).await.unwrap();
    let view = sessions
        .apply(
            app.products(),
            &admin(),
            view.session,
            ListingIntent::Delete { id: product.id },
        )
        .await
        .unwrap();

    let flash = view.flash.expect("flash after delete");
    assert_eq!(flash.kind, FlashKind::Success);
    assert_eq!(flash.message, "Product moved to Trash");
    assert!(view.items.is_empty());

    let again = sessions
        .render(app.products(), &admin(), view.session)
        .await
        .unwrap();
    assert_eq!(again.flash, None);
}

#[tokio::test]
async fn test_single_delete_by_user_is_forbidden() {
    let app = TestApp::new().await;
    let product = app.seed("Pixel 9", 799, 2, &app.phones).await;
    let mut controller = ListingController::open(app.products(), &user()).await.unwrap();

    let result = controller
        .apply(app.products(), &user(), ListingIntent::Delete { id: product.id })
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn test_sessions_are_private_to_their_owner() {
    let app = TestApp::new().await;
    let sessions = ListingSessions::default();

    let view = sessions.open(app.products(), &admin()).await.unwrap();

    let result = sessions.render(app.products(), &user(), view.session).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(sessions.close(&user(), view.session).await.is_err());

    sessions.close(&admin(), view.session).await.unwrap();
    assert!(sessions.is_empty().await);
}

#[tokio::test]
async fn test_view_lists_categories_for_the_filter() {
    let app = TestApp::new().await;
    let sessions = ListingSessions::default();

    let view = sessions.open(app.products(), &user()).await.unwrap();

    let names: Vec<&str> = view.categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Laptops", "Phones"]);
    assert_eq!(view.page, 1);
    assert_eq!(view.page_size, 10);
}

#[tokio::test]
async fn test_idle_session_expires() {
    let app = TestApp::new().await;
    let sessions = ListingSessions::new(Duration::from_millis(20));

    let view = sessions.open(app.products(), &admin()).await.unwrap();
    sessions
        .render(app.products(), &admin(), view.session)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(60)).await;

    let result = sessions.render(app.products(), &admin(), view.session).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(sessions.is_empty().await);
}

#[tokio::test]
async fn test_opening_a_session_evicts_abandoned_ones() {
    let app = TestApp::new().await;
    let sessions = ListingSessions::new(Duration::from_millis(20));

    for _ in 0..5 {
        sessions.open(app.products(), &user()).await.unwrap();
    }
    assert_eq!(sessions.len().await, 5);

    tokio::time::sleep(Duration::from_millis(60)).await;
    let view = sessions.open(app.products(), &admin()).await.unwrap();

    assert_eq!(sessions.len().await, 1);
    assert!(
        sessions
            .render(app.products(), &admin(), view.session)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_active_session_outlives_the_timeout() {
    let app = TestApp::new().await;
    let sessions = ListingSessions::new(Duration::from_millis(200));

    let view = sessions.open(app.products(), &admin()).await.unwrap();
    for _ in 0..4 {
        tokio::time::sleep(Duration::from_millis(80)).await;
        sessions
            .apply(
                app.products(),
                &admin(),
                view.session,
                ListingIntent::Page { page: 1 },
            )
            .await
            .unwrap();
    }

    assert_eq!(sessions.cleanup_expired().await, 0);
    assert_eq!(sessions.len().await, 1);
}
