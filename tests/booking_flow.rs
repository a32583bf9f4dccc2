//! Интеграционные тесты транзакции бронирования: отсутствие двойных
//! продаж, атомарность корзины, детерминированный отказ при повторе
//! и откат при сбое генерации артефакта.

use std::sync::atomic::{AtomicUsize, Ordering};

use sqlx::PgPool;

use ticket_manager::config::{BookingConfig, PaymentMode};
use ticket_manager::error::BookingError;
use ticket_manager::models::seat::status;
use ticket_manager::services::artifact::{ArtifactError, ArtifactGenerator, QrPayloadEncoder};
use ticket_manager::services::booking::{book_seats, BookingRequest};
use ticket_manager::services::inventory;
use ticket_manager::services::layout::{generate_layout, TierPrices};

fn test_config() -> BookingConfig {
    BookingConfig {
        lock_timeout_ms: 2000,
        payment_mode: PaymentMode::Settled,
    }
}

async fn create_user(pool: &PgPool, username: &str, role: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO users (username, email, password_hash, role)
         VALUES ($1, $2, '$2b$12$test-hash-not-used-here', $3)
         RETURNING user_id",
    )
    .bind(username)
    .bind(format!("{}@example.com", username))
    .bind(role)
    .fetch_one(pool)
    .await
    .expect("failed to create user")
}

async fn create_event(pool: &PgPool, organizer_id: i64, title: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO events (organizer_id, title, description, location, date_time)
         VALUES ($1, $2, '', 'Главный зал', '2030-12-31 20:00:00')
         RETURNING id",
    )
    .bind(organizer_id)
    .bind(title)
    .fetch_one(pool)
    .await
    .expect("failed to create event")
}

/// Создает сетку мест через генератор схемы и возвращает id
/// в порядке (ряд, номер).
async fn seed_seats(pool: &PgPool, event_id: i64, rows: u32, cols: u32) -> Vec<i64> {
    let layout = generate_layout(rows, cols, &TierPrices::default()).unwrap();
    let mut tx = pool.begin().await.unwrap();
    inventory::create_seats(&mut tx, event_id, &layout)
        .await
        .expect("failed to seed seats");
    tx.commit().await.unwrap();

    sqlx::query_scalar(
        "SELECT id FROM seats WHERE event_id = $1 ORDER BY row_label, seat_number",
    )
    .bind(event_id)
    .fetch_all(pool)
    .await
    .unwrap()
}

async fn seat_status(pool: &PgPool, seat_id: i64) -> String {
    sqlx::query_scalar("SELECT status FROM seats WHERE id = $1")
        .bind(seat_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn ticket_count(pool: &PgPool, event_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Кодировщик, отказывающий на N-м вызове. Для проверки отката.
struct FlakyEncoder {
    calls: AtomicUsize,
    fail_on: usize,
}

impl FlakyEncoder {
    fn fail_on(call: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: call,
        }
    }
}

impl ArtifactGenerator for FlakyEncoder {
    fn generate(&self, payload: &str) -> Result<String, ArtifactError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(ArtifactError::Encoder("рендер недоступен".to_string()));
        }
        QrPayloadEncoder.generate(payload)
    }
}

#[sqlx::test(migrations = "./src/migrations")]
async fn books_single_seat_and_issues_ticket(pool: PgPool) {
    let organizer = create_user(&pool, "org", "ORGANIZER").await;
    let customer = create_user(&pool, "cust", "CUSTOMER").await;
    let event_id = create_event(&pool, organizer, "Концерт").await;
    let seats = seed_seats(&pool, event_id, 1, 1).await;

    let request = BookingRequest { event_id, seat_ids: vec![seats[0]] };
    let outcome = book_seats(&pool, &QrPayloadEncoder, &test_config(), customer, &request)
        .await
        .expect("booking should succeed");

    assert_eq!(outcome.tickets.len(), 1);
    let issued = &outcome.tickets[0];
    assert_eq!(issued.seat_label, "A1");
    assert_eq!(issued.ticket.payment_status, "COMPLETED");
    assert!(issued.ticket.transaction_id.is_some());
    assert!(issued.ticket.qr_code.as_deref().unwrap_or("").starts_with("qr/"));

    assert_eq!(seat_status(&pool, seats[0]).await, status::BOOKED);
    assert_eq!(ticket_count(&pool, event_id).await, 1);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn tickets_follow_request_order_not_lock_order(pool: PgPool) {
    let organizer = create_user(&pool, "org", "ORGANIZER").await;
    let customer = create_user(&pool, "cust", "CUSTOMER").await;
    let event_id = create_event(&pool, organizer, "Концерт").await;
    let seats = seed_seats(&pool, event_id, 1, 3).await;

    // Запрос в порядке, обратном порядку блокировки
    let request = BookingRequest {
        event_id,
        seat_ids: vec![seats[2], seats[0], seats[1]],
    };
    let outcome = book_seats(&pool, &QrPayloadEncoder, &test_config(), customer, &request)
        .await
        .unwrap();

    let returned: Vec<i64> = outcome.tickets.iter().map(|t| t.ticket.seat_id).collect();
    assert_eq!(returned, vec![seats[2], seats[0], seats[1]]);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn no_double_booking_under_concurrency(pool: PgPool) {
    let organizer = create_user(&pool, "org", "ORGANIZER").await;
    let first = create_user(&pool, "cust1", "CUSTOMER").await;
    let second = create_user(&pool, "cust2", "CUSTOMER").await;
    let event_id = create_event(&pool, organizer, "Аншлаг").await;
    let seats = seed_seats(&pool, event_id, 1, 1).await;
    let seat_id = seats[0];

    let spawn_attempt = |pool: PgPool, customer: i64| {
        tokio::spawn(async move {
            let request = BookingRequest { event_id, seat_ids: vec![seat_id] };
            book_seats(&pool, &QrPayloadEncoder, &test_config(), customer, &request).await
        })
    };

    let (a, b) = tokio::join!(
        spawn_attempt(pool.clone(), first),
        spawn_attempt(pool.clone(), second)
    );
    let results = [a.unwrap(), b.unwrap()];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "ровно одна из гонок должна выиграть");

    let loser = results.iter().find(|r| r.is_err()).unwrap();
    assert!(matches!(
        loser.as_ref().unwrap_err(),
        BookingError::SeatUnavailable { .. }
    ));

    assert_eq!(seat_status(&pool, seat_id).await, status::BOOKED);
    assert_eq!(ticket_count(&pool, event_id).await, 1);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn multi_seat_cart_is_atomic(pool: PgPool) {
    let organizer = create_user(&pool, "org", "ORGANIZER").await;
    let customer = create_user(&pool, "cust", "CUSTOMER").await;
    let rival = create_user(&pool, "rival", "CUSTOMER").await;
    let event_id = create_event(&pool, organizer, "Концерт").await;
    let seats = seed_seats(&pool, event_id, 1, 3).await;

    // Соперник успевает выкупить среднее место
    let rival_request = BookingRequest { event_id, seat_ids: vec![seats[1]] };
    book_seats(&pool, &QrPayloadEncoder, &test_config(), rival, &rival_request)
        .await
        .unwrap();

    let request = BookingRequest {
        event_id,
        seat_ids: vec![seats[0], seats[1], seats[2]],
    };
    let err = book_seats(&pool, &QrPayloadEncoder, &test_config(), customer, &request)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SeatUnavailable { ref label } if label == "A2"));

    // Крайние места не тронуты, билетов на них нет
    assert_eq!(seat_status(&pool, seats[0]).await, status::AVAILABLE);
    assert_eq!(seat_status(&pool, seats[2]).await, status::AVAILABLE);
    assert_eq!(ticket_count(&pool, event_id).await, 1);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn identical_retry_is_rejected_for_every_seat(pool: PgPool) {
    let organizer = create_user(&pool, "org", "ORGANIZER").await;
    let customer = create_user(&pool, "cust", "CUSTOMER").await;
    let event_id = create_event(&pool, organizer, "Концерт").await;
    let seats = seed_seats(&pool, event_id, 1, 2).await;

    let request = BookingRequest { event_id, seat_ids: seats.clone() };
    book_seats(&pool, &QrPayloadEncoder, &test_config(), customer, &request)
        .await
        .unwrap();

    // Идемпотентность через отказ: повтор не создает дублей
    let err = book_seats(&pool, &QrPayloadEncoder, &test_config(), customer, &request)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SeatUnavailable { .. }));
    assert_eq!(ticket_count(&pool, event_id).await, 2);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn opposite_order_requests_both_terminate(pool: PgPool) {
    let organizer = create_user(&pool, "org", "ORGANIZER").await;
    let first = create_user(&pool, "cust1", "CUSTOMER").await;
    let second = create_user(&pool, "cust2", "CUSTOMER").await;
    let event_id = create_event(&pool, organizer, "Концерт").await;
    let seats = seed_seats(&pool, event_id, 1, 2).await;

    let spawn_attempt = |pool: PgPool, customer: i64, seat_ids: Vec<i64>| {
        tokio::spawn(async move {
            let request = BookingRequest { event_id, seat_ids };
            book_seats(&pool, &QrPayloadEncoder, &test_config(), customer, &request).await
        })
    };

    // Пересекающиеся корзины в противоположном порядке: блокировка по
    // возрастанию id гарантирует завершение без взаимной блокировки
    let joined = tokio::time::timeout(std::time::Duration::from_secs(10), async {
        tokio::join!(
            spawn_attempt(pool.clone(), first, vec![seats[0], seats[1]]),
            spawn_attempt(pool.clone(), second, vec![seats[1], seats[0]])
        )
    })
    .await
    .expect("requests must terminate, not deadlock");

    let results = [joined.0.unwrap(), joined.1.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert_eq!(ticket_count(&pool, event_id).await, 2);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn bounded_lock_wait_fails_with_busy(pool: PgPool) {
    let organizer = create_user(&pool, "org", "ORGANIZER").await;
    let customer = create_user(&pool, "cust", "CUSTOMER").await;
    let event_id = create_event(&pool, organizer, "Концерт").await;
    let seats = seed_seats(&pool, event_id, 1, 1).await;

    // Чужая транзакция держит блокировку места и не отпускает
    let mut holder = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM seats WHERE id = $1 FOR UPDATE")
        .bind(seats[0])
        .execute(&mut *holder)
        .await
        .unwrap();

    let cfg = BookingConfig {
        lock_timeout_ms: 200,
        payment_mode: PaymentMode::Settled,
    };
    let request = BookingRequest { event_id, seat_ids: vec![seats[0]] };
    let err = book_seats(&pool, &QrPayloadEncoder, &cfg, customer, &request)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Busy));

    holder.rollback().await.unwrap();
    assert_eq!(seat_status(&pool, seats[0]).await, status::AVAILABLE);
    assert_eq!(ticket_count(&pool, event_id).await, 0);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn artifact_failure_rolls_back_whole_cart(pool: PgPool) {
    let organizer = create_user(&pool, "org", "ORGANIZER").await;
    let customer = create_user(&pool, "cust", "CUSTOMER").await;
    let event_id = create_event(&pool, organizer, "Концерт").await;
    let seats = seed_seats(&pool, event_id, 1, 3).await;

    // Кодировщик падает на втором билете из трех
    let encoder = FlakyEncoder::fail_on(2);
    let request = BookingRequest { event_id, seat_ids: seats.clone() };
    let err = book_seats(&pool, &encoder, &test_config(), customer, &request)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::ArtifactGenerationFailed(_)));

    for seat_id in &seats {
        assert_eq!(seat_status(&pool, *seat_id).await, status::AVAILABLE);
    }
    assert_eq!(ticket_count(&pool, event_id).await, 0);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn seat_from_another_event_is_not_found(pool: PgPool) {
    let organizer = create_user(&pool, "org", "ORGANIZER").await;
    let customer = create_user(&pool, "cust", "CUSTOMER").await;
    let event_a = create_event(&pool, organizer, "Концерт A").await;
    let event_b = create_event(&pool, organizer, "Концерт B").await;
    seed_seats(&pool, event_a, 1, 1).await;
    let foreign = seed_seats(&pool, event_b, 1, 1).await;

    let request = BookingRequest { event_id: event_a, seat_ids: vec![foreign[0]] };
    let err = book_seats(&pool, &QrPayloadEncoder, &test_config(), customer, &request)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SeatNotFound { seat_id } if seat_id == foreign[0]));

    assert_eq!(seat_status(&pool, foreign[0]).await, status::AVAILABLE);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn empty_cart_and_missing_event_are_invalid(pool: PgPool) {
    let customer = create_user(&pool, "cust", "CUSTOMER").await;

    let empty = BookingRequest { event_id: 1, seat_ids: vec![] };
    assert!(matches!(
        book_seats(&pool, &QrPayloadEncoder, &test_config(), customer, &empty).await,
        Err(BookingError::InvalidRequest(_))
    ));

    let missing = BookingRequest { event_id: 12345, seat_ids: vec![1] };
    assert!(matches!(
        book_seats(&pool, &QrPayloadEncoder, &test_config(), customer, &missing).await,
        Err(BookingError::InvalidRequest(_))
    ));
}

#[sqlx::test(migrations = "./src/migrations")]
async fn duplicate_seat_in_cart_is_rejected_and_rolled_back(pool: PgPool) {
    let organizer = create_user(&pool, "org", "ORGANIZER").await;
    let customer = create_user(&pool, "cust", "CUSTOMER").await;
    let event_id = create_event(&pool, organizer, "Концерт").await;
    let seats = seed_seats(&pool, event_id, 1, 1).await;

    let request = BookingRequest { event_id, seat_ids: vec![seats[0], seats[0]] };
    let err = book_seats(&pool, &QrPayloadEncoder, &test_config(), customer, &request)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SeatUnavailable { .. }));

    assert_eq!(seat_status(&pool, seats[0]).await, status::AVAILABLE);
    assert_eq!(ticket_count(&pool, event_id).await, 0);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn pending_payment_mode_issues_pending_tickets(pool: PgPool) {
    let organizer = create_user(&pool, "org", "ORGANIZER").await;
    let customer = create_user(&pool, "cust", "CUSTOMER").await;
    let event_id = create_event(&pool, organizer, "Концерт").await;
    let seats = seed_seats(&pool, event_id, 1, 1).await;

    let cfg = BookingConfig {
        lock_timeout_ms: 2000,
        payment_mode: PaymentMode::Pending,
    };
    let request = BookingRequest { event_id, seat_ids: vec![seats[0]] };
    let outcome = book_seats(&pool, &QrPayloadEncoder, &cfg, customer, &request)
        .await
        .unwrap();

    assert_eq!(outcome.tickets[0].ticket.payment_status, "PENDING");
    // Место занято независимо от режима оплаты
    assert_eq!(seat_status(&pool, seats[0]).await, status::BOOKED);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn layout_cannot_be_generated_twice_for_one_event(pool: PgPool) {
    let organizer = create_user(&pool, "org", "ORGANIZER").await;
    let event_id = create_event(&pool, organizer, "Концерт").await;

    let layout = generate_layout(2, 2, &TierPrices::default()).unwrap();

    let mut tx = pool.begin().await.unwrap();
    let created = inventory::create_seats(&mut tx, event_id, &layout).await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(created, 4);

    let mut tx = pool.begin().await.unwrap();
    let err = inventory::create_seats(&mut tx, event_id, &layout)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::LayoutExists { event_id: e } if e == event_id));
}
