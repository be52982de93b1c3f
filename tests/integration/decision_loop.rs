//! End-to-end cycles through `DecisionLoop` with mock collaborators.

use rust_decimal_macros::dec;
use std::time::Duration;

use kenobot::config::{AppConfig, PacingConfig};
use kenobot::display::Renderer;
use kenobot::engine::{DecisionLoop, LoopConfig, LoopState, Pacer};
use kenobot::predictor::RecencyNet;
use kenobot::strategy::{DecisionPolicy, PolicyConfig};
use kenobot::types::{CycleOutcome, Distribution, SkipReason};

use crate::mock_exchange::{peaked, rounds, FixedPredictor, MockExchange, RecordingRenderer};

type TestLoop<P> = DecisionLoop<MockExchange, P, RecordingRenderer>;

fn no_pacing() -> Pacer {
    Pacer::seeded(
        &PacingConfig {
            min_secs: 0.0,
            max_secs: 0.0,
        },
        7,
    )
}

fn make_loop<P: kenobot::predictor::Predictor>(
    exchange: &MockExchange,
    predictor: P,
    renderer: &RecordingRenderer,
) -> TestLoop<P> {
    DecisionLoop::new(
        exchange.clone(),
        predictor,
        renderer.clone(),
        DecisionPolicy::new(PolicyConfig::default()),
        no_pacing(),
        LoopConfig::default(),
    )
}

#[tokio::test]
async fn window_never_exceeds_lookback() {
    let exchange = MockExchange::with_rounds(300);
    let predictor = FixedPredictor::new(Distribution::uniform(20));
    let renderer = RecordingRenderer::default();
    let mut lp = make_loop(&exchange, predictor.clone(), &renderer);

    lp.bootstrap().await;
    assert_eq!(lp.history().len(), 300);

    for i in 300..305 {
        exchange.publish(rounds(i, i + 1));
        lp.run_cycle().await;
    }

    let windows = predictor.windows();
    assert_eq!(windows.len(), 5);
    for (w, newest) in windows.iter().zip(300..305) {
        assert_eq!(w.len(), 50);
        let expected = rounds(newest, newest + 1)[0].encode(20);
        assert_eq!(w.rows().last(), Some(&expected));
    }
}

#[tokio::test]
async fn threshold_is_strictly_greater_than() {
    let renderer = RecordingRenderer::default();

    let below = MockExchange::with_rounds(60);
    let mut lp = make_loop(&below, FixedPredictor::new(peaked(0.84999, 2)), &renderer);
    lp.bootstrap().await;
    let report = lp.run_cycle().await;
    assert_eq!(report.outcome, CycleOutcome::Skipped(SkipReason::LowConfidence));
    assert!(below.bets().is_empty());

    let above = MockExchange::with_rounds(60);
    let mut lp = make_loop(&above, FixedPredictor::new(peaked(0.85001, 2)), &renderer);
    lp.bootstrap().await;
    let report = lp.run_cycle().await;
    assert!(matches!(report.outcome, CycleOutcome::BetPlaced(_)));
    assert_eq!(above.bets().len(), 1);
}

#[tokio::test]
async fn bet_plays_top_five_numbers() {
    let mut raw = vec![0.001; 20];
    raw[13] = 0.90;
    raw[4] = 0.03;
    raw[8] = 0.02;
    raw[15] = 0.02;
    raw[1] = 0.01;
    let answer = Distribution::new(raw).unwrap();

    let exchange = MockExchange::with_rounds(60);
    let renderer = RecordingRenderer::default();
    let mut lp = make_loop(&exchange, FixedPredictor::new(answer), &renderer);
    lp.bootstrap().await;
    lp.run_cycle().await;

    let bets = exchange.bets();
    assert_eq!(bets.len(), 1);
    let (numbers, stake, currency) = &bets[0];
    // 8 and 15 tie; the lower number ranks first.
    assert_eq!(numbers, &vec![13, 4, 8, 15, 1]);
    assert_eq!(*stake, dec!(0.01));
    assert_eq!(currency, "btc");
}

#[tokio::test]
async fn empty_fetch_skips_without_predicting() {
    let exchange = MockExchange::with_rounds(200);
    exchange.fail_history(true);
    let predictor = FixedPredictor::new(peaked(0.99, 0));
    let renderer = RecordingRenderer::default();
    let mut lp = make_loop(&exchange, predictor.clone(), &renderer);

    let report = lp.run_cycle().await;
    assert_eq!(report.outcome, CycleOutcome::Skipped(SkipReason::NoUpdate));
    assert_eq!(report.rounds_fetched, 0);
    assert!(predictor.windows().is_empty());
    assert!(exchange.bets().is_empty());

    // The cycle still rendered, with no prediction to show.
    let frames = renderer.frames();
    assert_eq!(frames.len(), 1);
    assert!(frames[0].distribution.is_none());
}

#[tokio::test]
async fn failed_fetch_never_bets_on_stale_history() {
    let exchange = MockExchange::with_rounds(200);
    let predictor = FixedPredictor::new(peaked(0.99, 0));
    let renderer = RecordingRenderer::default();
    let mut lp = make_loop(&exchange, predictor.clone(), &renderer);

    lp.bootstrap().await;
    assert_eq!(lp.history().len(), 200);

    exchange.fail_history(true);
    for _ in 0..3 {
        let report = lp.run_cycle().await;
        assert_eq!(report.rounds_fetched, 0);
        assert_eq!(report.outcome, CycleOutcome::Skipped(SkipReason::NoUpdate));
    }
    assert!(predictor.windows().is_empty());
    assert!(exchange.bets().is_empty());
    assert_eq!(lp.history().len(), 200);

    // Once the exchange answers again, the loop bets as usual.
    exchange.fail_history(false);
    let report = lp.run_cycle().await;
    assert!(matches!(report.outcome, CycleOutcome::BetPlaced(_)));
    assert_eq!(exchange.bets().len(), 1);
}

#[tokio::test]
async fn history_grows_by_successful_bets_only() {
    let exchange = MockExchange::with_rounds(60);
    let renderer = RecordingRenderer::default();
    let mut lp = make_loop(&exchange, FixedPredictor::new(peaked(0.95, 5)), &renderer);

    lp.bootstrap().await;
    let initial = lp.history().len();
    assert_eq!(initial, 60);

    for _ in 0..3 {
        let report = lp.run_cycle().await;
        assert!(matches!(report.outcome, CycleOutcome::BetPlaced(_)));
    }
    assert_eq!(lp.history().len(), initial + 3);

    exchange.fail_bets(true);
    for _ in 0..2 {
        let report = lp.run_cycle().await;
        assert_eq!(
            report.outcome,
            CycleOutcome::BetFailed {
                numbers: vec![5, 0, 1, 2, 3]
            }
        );
    }
    assert_eq!(lp.history().len(), initial + 3);
    assert_eq!(exchange.bets().len(), 5);
    assert_eq!(lp.recent_bets().len(), 3);
}

#[tokio::test]
async fn reused_bet_ids_still_grow_history() {
    let exchange = MockExchange::with_rounds(60);
    // Collides with a fetched round id as well as with itself.
    exchange.fix_bet_id("r59");
    let renderer = RecordingRenderer::default();
    let mut lp = make_loop(&exchange, FixedPredictor::new(peaked(0.95, 5)), &renderer);

    lp.bootstrap().await;
    let initial = lp.history().len();
    for _ in 0..2 {
        let report = lp.run_cycle().await;
        assert!(matches!(report.outcome, CycleOutcome::BetPlaced(_)));
    }
    assert_eq!(lp.history().len(), initial + 2);
    assert_eq!(lp.recent_bets().len(), 2);
}

#[tokio::test]
async fn recent_bets_capped_at_five() {
    let exchange = MockExchange::with_rounds(60);
    let renderer = RecordingRenderer::default();
    let mut lp = make_loop(&exchange, FixedPredictor::new(peaked(0.95, 5)), &renderer);
    lp.bootstrap().await;

    for _ in 0..8 {
        lp.run_cycle().await;
    }
    let recent = lp.recent_bets();
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0].id, "bet-4");
    assert_eq!(recent[4].id, "bet-8");

    let last = renderer.frames().pop().unwrap();
    assert_eq!(last.recent.len(), 5);
}

#[tokio::test]
async fn render_leaves_state_untouched() {
    let exchange = MockExchange::with_rounds(60);
    let renderer = RecordingRenderer::default();
    let mut lp = make_loop(&exchange, FixedPredictor::new(peaked(0.95, 5)), &renderer);
    lp.bootstrap().await;
    lp.run_cycle().await;

    let history_len = lp.history().len();
    let balance = lp.balance();
    let frame = renderer.frames().pop().unwrap();

    let mut view = renderer.clone();
    for _ in 0..2 {
        view.render(frame.balance, &frame.recent, frame.distribution.as_ref());
    }

    let frames = renderer.frames();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[1], frames[2]);
    assert_eq!(lp.history().len(), history_len);
    assert_eq!(lp.balance(), balance);
}

#[tokio::test]
async fn balance_falls_back_to_last_known() {
    let exchange = MockExchange::with_rounds(10);
    let renderer = RecordingRenderer::default();
    let mut lp = make_loop(&exchange, FixedPredictor::new(Distribution::uniform(20)), &renderer);

    assert_eq!(lp.run_cycle().await.balance, dec!(1.0));

    exchange.set_balance(Some(dec!(2.5)));
    assert_eq!(lp.run_cycle().await.balance, dec!(2.5));

    exchange.set_balance(None);
    assert_eq!(lp.run_cycle().await.balance, dec!(2.5));
    assert_eq!(renderer.frames().last().unwrap().balance, dec!(2.5));
}

#[tokio::test]
async fn untrained_model_never_bets() {
    let exchange = MockExchange::with_rounds(40);
    let renderer = RecordingRenderer::default();
    let cfg = AppConfig::default();
    let net = RecencyNet::new(20, 50, &cfg.model);
    let mut lp = make_loop(&exchange, net, &renderer);

    // 40 rounds cannot fill a 50-round lookback, so training fails.
    assert!(lp.bootstrap().await.is_none());

    exchange.publish(rounds(40, 60));
    let report = lp.run_cycle().await;
    assert_eq!(report.outcome, CycleOutcome::Skipped(SkipReason::LowConfidence));
    assert!((report.confidence.unwrap() - 0.05).abs() < 1e-12);
    assert!(exchange.bets().is_empty());
}

#[tokio::test]
async fn run_until_exits_on_shutdown() {
    let exchange = MockExchange::with_rounds(60);
    let renderer = RecordingRenderer::default();
    let mut lp = make_loop(&exchange, FixedPredictor::new(Distribution::uniform(20)), &renderer);

    let cycles = tokio::time::timeout(
        Duration::from_secs(5),
        lp.run_until(tokio::time::sleep(Duration::from_millis(50))),
    )
    .await
    .expect("loop should stop once shutdown resolves");

    assert!(cycles >= 1);
    assert_eq!(cycles, lp.cycle_count());
    assert_eq!(exchange.history_calls() as u64, cycles);
    assert_eq!(lp.state(), LoopState::Idle);
}
