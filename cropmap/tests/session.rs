//! Tests d'intégration de la session sur les fichiers de fixtures

mod common;

use choropleth::{Category, OnEnd};
use cropmap::{Applied, DataSource, DrawCommand, FsSource, MapSession};

use common::{fixture_config, fixture_years};

#[test]
fn test_fixture_discovery() {
    let years: Vec<i32> = fixture_years().into_keys().collect();
    assert_eq!(years, vec![1980, 1981, 1982]);
}

#[tokio::test]
async fn test_year_transitions_from_files() {
    let config = fixture_config();
    let source = FsSource::new(config.data.clone());
    let mut session = MapSession::from_config(&config).unwrap();

    let first = session.on_year_selected(&source, 0).await.frame().unwrap();
    assert_eq!(first.year, 1980);
    assert_eq!(first.diff.entering.len(), 3);
    assert!(first.legend.is_some());
    assert_eq!(session.render_set().get("17003").unwrap().category, Category::NoData);
    assert_eq!(session.render_set().get("17001").unwrap().category, Category::Bucket(2));

    let second = session.on_year_selected(&source, 1).await.frame().unwrap();
    assert_eq!(second.year, 1981);
    assert!(second.legend.is_none());
    assert_eq!(
        second.commands,
        vec![
            DrawCommand::Enter {
                id: "19003".into(),
                fill: "#e5f5e0".into(),
                highlighted: false
            },
            DrawCommand::Exit { id: "17003".into() },
        ]
    );
    assert_eq!(session.render_set().ids(), vec!["17001", "19001", "19003"]);
}

#[tokio::test]
async fn test_out_of_range_index_is_clamped() {
    let config = fixture_config();
    let source = FsSource::new(config.data.clone());
    let mut session = MapSession::from_config(&config).unwrap();

    let frame = session.on_year_selected(&source, 99).await.frame().unwrap();
    assert_eq!(frame.year, 1982);
    assert_eq!(session.timeline().current_index(), 2);

    let frame = session.on_year_selected(&source, -5).await.frame().unwrap();
    assert_eq!(frame.year, 1980);
}

#[tokio::test]
async fn test_missing_year_keeps_previous_frame() {
    let mut config = fixture_config();
    config.timeline.last_year = 1983;
    let source = FsSource::new(config.data.clone());
    let mut session = MapSession::from_config(&config).unwrap();

    session.on_year_selected(&source, 2).await;
    session.on_feature_clicked("17003");
    let before = session.render_set().ids().len();

    let applied = session.on_year_selected(&source, 3).await;

    assert!(matches!(applied, Applied::Failed(_)));
    assert_eq!(session.render_set().ids().len(), before);
    assert_eq!(session.selection().selected(), Some("17003"));
    assert_eq!(session.render_set().highlighted(), Some("17003"));

    let mut report = session.into_report();
    report.finalize();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].year, 1983);
    assert_eq!(report.status, cropmap::SessionStatus::PartialSuccess);
}

#[tokio::test]
async fn test_selection_survives_gap_and_zooms_on_layer() {
    let config = fixture_config();
    let source = FsSource::new(config.data.clone());
    let mut session = MapSession::from_config(&config).unwrap();
    session.timeline_mut().set_on_end(OnEnd::Stop);

    let counties = source.load_layer("counties").await.unwrap();
    session.store_mut().insert_layer("counties", counties);

    let click = session.on_feature_clicked("17003");
    assert!(click.zoom.as_ref().unwrap().bounds.is_some());

    let frame = session.on_year_selected(&source, 0).await.frame().unwrap();
    assert!(frame.info.unwrap().to_string().starts_with("ALEXANDER, ILLINOIS"));

    let frame = session.on_year_selected(&source, 1).await.frame().unwrap();
    assert!(frame
        .info
        .unwrap()
        .to_string()
        .ends_with("Data: unavailable for this year"));

    let frame = session.on_year_selected(&source, 2).await.frame().unwrap();
    assert!(frame.commands.contains(&DrawCommand::Enter {
        id: "17003".into(),
        fill: "#e5f5e0".into(),
        highlighted: true
    }));
}

#[tokio::test]
async fn test_metric_switch_reuses_current_year() {
    let config = fixture_config();
    let source = FsSource::new(config.data.clone());
    let mut session = MapSession::from_config(&config).unwrap();

    session.on_year_selected(&source, 0).await;
    let ids_before = session.render_set().ids().len();

    let frame = session.on_metric_changed("production_percentile").unwrap();

    assert!(frame.diff.entering.is_empty());
    assert!(frame.diff.exiting.is_empty());
    assert_eq!(session.render_set().ids().len(), ids_before);
    assert_eq!(session.render_set().get("17003").unwrap().category, Category::NoData);
    assert_eq!(session.render_set().get("17001").unwrap().category, Category::Bucket(4));

    let legend = frame.legend.unwrap();
    assert_eq!(legend.items[0].label, "Bottom 20%");
    assert_eq!(legend.items.last().unwrap().label, "No data");
}
