//! Game discovery, selection and specialisation filtering

use std::fs;
use std::path::Path;

use crafting_calculator::catalog::{Catalog, DATA_FILE, META_FILE};
use crafting_calculator::db;
use crafting_calculator::view::{OutputSlot, TreeView};
use crafting_calculator::{CraftError, aggregate};
use rstest::{fixture, rstest};
use rusqlite::Connection;
use tempfile::TempDir;

fn write_game(root: &Path, id: &str, meta: &str, data: &str) {
    let dir = root.join(id);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(META_FILE), meta).unwrap();
    fs::write(dir.join(DATA_FILE), data).unwrap();
}

#[fixture]
fn data_dir() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write_game(
        tmp.path(),
        "yonder",
        r#"{"title": "Yonder", "specialisations": ["Tailoring"]}"#,
        r#"{
            "Stew": {"specialisation": "Cooking", "items": {"Fish": 2, "Water": 1}},
            "Sword": {"specialisation": "Smithing", "items": {"Iron": 3}}
        }"#,
    );
    write_game(tmp.path(), "atlas", r#"{"title": "Atlas"}"#, r#"[{"name": "Rope"}]"#);
    // no title: not a game
    write_game(tmp.path(), "drafts", r#"{}"#, r#"{}"#);
    tmp
}

#[fixture]
fn conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

#[rstest]
fn given_data_dir_when_discovering_then_lists_titled_games_sorted(data_dir: TempDir) {
    let catalog = Catalog::new(data_dir.path());

    let games = catalog.discover_datasets().unwrap();

    let ids: Vec<_> = games.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(ids, ["atlas", "yonder"]);
    assert_eq!(games[1].title, "Yonder");
}

#[rstest]
fn given_broken_meta_when_discovering_then_skips_it(data_dir: TempDir) {
    write_game(data_dir.path(), "broken", "{oops", "{}");
    let catalog = Catalog::new(data_dir.path());

    let games = catalog.discover_datasets().unwrap();

    assert_eq!(games.len(), 2);
}

#[rstest]
fn given_game_when_discovering_groups_then_merges_meta_and_tags(data_dir: TempDir) {
    let catalog = Catalog::new(data_dir.path());

    let groups = catalog.discover_groups("yonder").unwrap();

    assert_eq!(groups, ["Cooking", "Smithing", "Tailoring"]);
}

#[rstest]
fn given_group_when_filtering_then_keeps_tagged_roots(data_dir: TempDir) {
    let catalog = Catalog::new(data_dir.path());

    let forest = catalog.filter_by_group("yonder", "Smithing").unwrap();

    assert_eq!(forest.len(), 1);
    assert_eq!(forest.roots[0].name, "Sword");
}

#[rstest]
fn given_unknown_group_when_filtering_then_errors(data_dir: TempDir) {
    let catalog = Catalog::new(data_dir.path());

    let err = catalog.filter_by_group("yonder", "Alchemy").unwrap_err();

    assert!(matches!(err, CraftError::UnknownGroup { .. }));
}

#[rstest]
fn given_unknown_game_when_selecting_then_errors(data_dir: TempDir, conn: Connection) {
    let catalog = Catalog::new(data_dir.path());

    let err = catalog.select_dataset(&conn, "drafts").unwrap_err();

    assert!(matches!(err, CraftError::UnknownDataset(_)));
    assert!(db::get_selection(&conn, db::GAME_KEY).unwrap().is_none());
}

#[rstest]
fn given_no_selection_when_loading_current_tree_then_errors(data_dir: TempDir, conn: Connection) {
    let catalog = Catalog::new(data_dir.path());

    assert!(matches!(
        catalog.current_tree(&conn),
        Err(CraftError::NoDatasetSelected)
    ));
}

#[rstest]
fn given_selection_when_loading_current_tree_then_applies_specialisation(
    data_dir: TempDir,
    conn: Connection,
) {
    let catalog = Catalog::new(data_dir.path());
    catalog.select_dataset(&conn, "yonder").unwrap();
    assert_eq!(catalog.current_tree(&conn).unwrap().len(), 2);

    catalog.select_group(&conn, "Cooking").unwrap();
    let forest = catalog.current_tree(&conn).unwrap();
    assert_eq!(forest.len(), 1);

    let list = aggregate(forest.find("Stew").unwrap(), 3.0).unwrap();
    let text = list.to_string();
    assert!(text.contains(" - Fish: 6\n - Water: 3\n"));
}

#[rstest]
fn given_new_game_selected_then_specialisation_is_reset(data_dir: TempDir, conn: Connection) {
    let catalog = Catalog::new(data_dir.path());
    catalog.select_dataset(&conn, "yonder").unwrap();
    catalog.select_group(&conn, "Smithing").unwrap();

    catalog.select_dataset(&conn, "atlas").unwrap();

    let selection = db::current_selection(&conn).unwrap();
    assert_eq!(selection.game.as_deref(), Some("atlas"));
    assert!(selection.specialisation.is_none());
    assert_eq!(catalog.current_tree(&conn).unwrap().roots[0].name, "Rope");
}

#[rstest]
fn given_broken_data_file_when_loading_then_data_unavailable(data_dir: TempDir, conn: Connection) {
    write_game(data_dir.path(), "broken", r#"{"title": "Broken"}"#, "[{");
    let catalog = Catalog::new(data_dir.path());
    catalog.select_dataset(&conn, "broken").unwrap();

    assert!(matches!(
        catalog.current_tree(&conn),
        Err(CraftError::DataUnavailable { .. })
    ));
}

#[rstest]
fn given_current_tree_when_editing_quantity_then_output_is_fresh(
    data_dir: TempDir,
    conn: Connection,
) {
    let catalog = Catalog::new(data_dir.path());
    catalog.select_dataset(&conn, "yonder").unwrap();
    let mut view = TreeView::new(catalog.current_tree(&conn).unwrap());

    view.toggle("Sword").unwrap();
    view.set_quantity("Sword", "4").unwrap();

    match &view.row("Sword").unwrap().output {
        OutputSlot::Ready(list) => assert_eq!(list.gather[0].quantity, 12.0),
        other => panic!("expected a shopping list, got {:?}", other),
    }
}
