use torus_life::backend::BackendKind;
use torus_life::{LifeError, TorusLife, TorusLifeConfig, snapshot};

const CORPUS: &[&str] = &[
    "1,1\nx\n",
    "1,1\n.\n",
    "3,1\nx.x\n",
    "1,4\nx\n.\n.\nx\n",
    "5,3\n.....\n.xxx.\n.....\n",
    "8,4\nxxxxxxxx\nx......x\nx......x\nxxxxxxxx\n",
    "12,2\n.x.x.x.x.x.x\nx.x.x.x.x.x.\n",
];

#[test]
fn round_trip_preserves_text() {
    for text in CORPUS {
        let grid = snapshot::parse(text).unwrap();
        assert_eq!(&snapshot::render(&grid), text);

        let mut rendered = format!("{},{}\n", grid.width(), grid.height());
        for row in grid.serialize() {
            rendered.push_str(&row);
            rendered.push('\n');
        }
        assert_eq!(&rendered, text);
    }
}

#[test]
fn file_round_trip_and_compare() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    std::fs::write(&input, CORPUS[4]).unwrap();

    let grid = snapshot::read(&input).unwrap();
    snapshot::write(&output, &grid).unwrap();
    assert_eq!(std::fs::read_to_string(&output).unwrap(), CORPUS[4]);
    assert!(snapshot::files_match(&input, &output).unwrap());
}

#[test]
fn compare_detects_differences_and_missing_lines() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    let c = dir.path().join("c.txt");
    std::fs::write(&a, "3,2\nx..\n...\n").unwrap();
    std::fs::write(&b, "3,2\nx..\n..x\n").unwrap();
    std::fs::write(&c, "3,2\nx..\n").unwrap();

    assert!(!snapshot::files_match(&a, &b).unwrap());
    assert!(!snapshot::files_match(&a, &c).unwrap());
    assert!(snapshot::files_match(&c, &a).unwrap());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = snapshot::read(dir.path().join("absent.txt")).unwrap_err();
    assert!(matches!(err, LifeError::Io { .. }));
}

#[test]
fn malformed_snapshots_fail_before_running() {
    for text in [
        "",
        "3;2\nx..\n...\n",
        "3,2\nx..\n",
        "3,2\nx..\n..\n",
        "3,2\nx...\n...\n",
        "100000000000000,1\nx\n",
    ] {
        let err = snapshot::parse(text).unwrap_err();
        assert!(
            matches!(err, LifeError::MalformedInput { .. }),
            "{text:?} gave {err:?}"
        );
        assert!(err.is_setup_error());
    }
}

#[test]
fn blinker_snapshot_after_two_generations_is_unchanged() {
    let text = "5,5\n.....\n..x..\n..x..\n..x..\n.....\n";
    let grid = snapshot::parse(text).unwrap();
    let mut engine = TorusLife::with_config(
        grid,
        TorusLifeConfig::default()
            .backend(BackendKind::Parallel)
            .thread_count(2),
    )
    .unwrap();
    engine.step().unwrap();
    assert_eq!(
        snapshot::render(engine.grid()),
        "5,5\n.....\n.....\n.xxx.\n.....\n.....\n"
    );
    engine.step().unwrap();
    assert_eq!(snapshot::render(&engine.into_grid()), text);
}
