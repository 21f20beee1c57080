use crate::artifacts::{ArtifactStore, BackendCsv, NewArtifact, StoreError};

fn new_artifact(title: &str, embedding: Vec<f32>) -> NewArtifact {
    NewArtifact {
        url: format!("https://example.com/{title}"),
        title: title.to_string(),
        content: format!("{title} content"),
        embedding,
    }
}

#[test]
fn test_ids_start_at_one_and_increase() {
    let tmp = tempfile::tempdir().unwrap();
    let store = BackendCsv::load(tmp.path().to_str().unwrap()).unwrap();

    let a = store.insert(new_artifact("a", vec![1.0])).unwrap();
    let b = store.insert(new_artifact("b", vec![1.0])).unwrap();

    assert_eq!(a.id, 1);
    assert_eq!(b.id, 2);
}

#[test]
fn test_records_survive_reload() {
    let tmp = tempfile::tempdir().unwrap();
    let base = tmp.path().to_str().unwrap();

    let store = BackendCsv::load(base).unwrap();
    let a = store.insert(new_artifact("a", vec![0.25, -0.5])).unwrap();
    store.insert(new_artifact("b", vec![1.0, 0.0])).unwrap();
    store.delete(2).unwrap();

    let reloaded = BackendCsv::load(base).unwrap();
    let all = reloaded.list_all().unwrap();

    assert_eq!(all, vec![a]);
    assert_eq!(all[0].embedding, vec![0.25, -0.5]);

    // a reload resumes numbering after the highest remaining id
    let c = reloaded.insert(new_artifact("c", vec![1.0, 0.0])).unwrap();
    assert_eq!(c.id, 2);
}

#[test]
fn test_replace_keeps_id_and_created_at() {
    let tmp = tempfile::tempdir().unwrap();
    let base = tmp.path().to_str().unwrap();
    let store = BackendCsv::load(base).unwrap();

    let original = store.insert(new_artifact("old", vec![1.0, 0.0])).unwrap();
    let replaced = store
        .replace(original.id, new_artifact("new", vec![0.0, 1.0]))
        .unwrap();

    assert_eq!(replaced.id, original.id);
    assert_eq!(replaced.created_at, original.created_at);
    assert_eq!(replaced.title, "new");
    assert_eq!(replaced.embedding, vec![0.0, 1.0]);

    let reloaded = BackendCsv::load(base).unwrap();
    assert_eq!(reloaded.get(original.id).unwrap(), Some(replaced));
}

#[test]
fn test_missing_ids() {
    let tmp = tempfile::tempdir().unwrap();
    let store = BackendCsv::load(tmp.path().to_str().unwrap()).unwrap();

    assert!(store.get(42).unwrap().is_none());
    assert!(matches!(
        store.replace(42, new_artifact("x", vec![1.0])),
        Err(StoreError::NotFound(42))
    ));
    assert!(matches!(store.delete(42), Err(StoreError::NotFound(42))));
    assert!(store.list_all().unwrap().is_empty());
}

#[test]
fn test_list_all_newest_first() {
    let tmp = tempfile::tempdir().unwrap();
    let store = BackendCsv::load(tmp.path().to_str().unwrap()).unwrap();

    for title in ["first", "second", "third"] {
        store.insert(new_artifact(title, vec![1.0])).unwrap();
    }

    let titles: Vec<String> = store
        .list_all()
        .unwrap()
        .into_iter()
        .map(|a| a.title)
        .collect();

    assert_eq!(titles, vec!["third", "second", "first"]);
}

#[test]
fn test_queries_over_stored_vectors() {
    let tmp = tempfile::tempdir().unwrap();
    let store = BackendCsv::load(tmp.path().to_str().unwrap()).unwrap();

    store.insert(new_artifact("east", vec![1.0, 0.0])).unwrap();
    store.insert(new_artifact("north", vec![0.0, 1.0])).unwrap();
    store.insert(new_artifact("north-east", vec![0.6, 0.8])).unwrap();

    let hits = store.similarity_query(&[1.0, 0.0], 0.5, 10).unwrap();
    let ids: Vec<u64> = hits.iter().map(|h| h.artifact.id).collect();
    assert_eq!(ids, vec![1, 3]);

    let limited = store.similarity_query(&[1.0, 0.0], 0.5, 1).unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].artifact.id, 1);

    let lexical = store.lexical_query("north", 10).unwrap();
    let ids: Vec<u64> = lexical.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![2, 3]);

    assert_eq!(store.lexical_query("north", 1).unwrap().len(), 1);
    assert!(store.lexical_query("North", 10).unwrap().is_empty());
}

#[test]
fn test_corrupt_file_fails_to_load() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("artifacts.csv"),
        "id,url,title,content,created_at,embedding\nnot-a-number,u,t,c,2024-01-01T00:00:00Z,\n",
    )
    .unwrap();

    assert!(matches!(
        BackendCsv::load(tmp.path().to_str().unwrap()),
        Err(StoreError::Corrupt(_))
    ));
}

#[test]
fn test_two_handles_on_one_directory_do_not_clobber() {
    let tmp = tempfile::tempdir().unwrap();
    let base = tmp.path().to_str().unwrap();

    // daemon and a standalone CLI each open the directory
    let daemon = BackendCsv::load(base).unwrap();
    let cli = BackendCsv::load(base).unwrap();

    let a = daemon.insert(new_artifact("daemon", vec![1.0, 0.0])).unwrap();
    let b = cli.insert(new_artifact("cli", vec![0.0, 1.0])).unwrap();

    assert_eq!(a.id, 1);
    assert_eq!(b.id, 2);

    // the daemon sees the cli write without reloading explicitly
    assert_eq!(daemon.get(b.id).unwrap(), Some(b.clone()));

    let reloaded = BackendCsv::load(base).unwrap();
    let mut ids: Vec<u64> = reloaded.list_all().unwrap().iter().map(|x| x.id).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_delete_in_other_handle_is_visible() {
    let tmp = tempfile::tempdir().unwrap();
    let base = tmp.path().to_str().unwrap();

    let first = BackendCsv::load(base).unwrap();
    let second = BackendCsv::load(base).unwrap();

    let a = first.insert(new_artifact("a", vec![1.0])).unwrap();
    second.delete(a.id).unwrap();

    assert!(first.get(a.id).unwrap().is_none());
    assert!(matches!(
        first.replace(a.id, new_artifact("a2", vec![1.0])),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn test_concurrent_inserts_from_separate_handles_get_unique_ids() {
    let tmp = tempfile::tempdir().unwrap();
    let base = tmp.path().to_str().unwrap().to_string();

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let store = BackendCsv::load(&base).unwrap();
            std::thread::spawn(move || {
                (0..5)
                    .map(|n| {
                        store
                            .insert(new_artifact(&format!("w{worker}-{n}"), vec![1.0]))
                            .unwrap()
                            .id
                    })
                    .collect::<Vec<u64>>()
            })
        })
        .collect();

    let mut ids: Vec<u64> = workers
        .into_iter()
        .flat_map(|w| w.join().unwrap())
        .collect();
    ids.sort();

    assert_eq!(ids, (1..=20).collect::<Vec<u64>>());
    assert_eq!(BackendCsv::load(&base).unwrap().list_all().unwrap().len(), 20);
}

#[test]
fn test_max_id_on_disk_is_corrupt_not_overflow() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("artifacts.csv"),
        format!(
            "id,url,title,content,created_at,embedding\n{},u,t,c,2024-01-01T00:00:00Z,AACAPw==\n",
            u64::MAX
        ),
    )
    .unwrap();

    assert!(matches!(
        BackendCsv::load(tmp.path().to_str().unwrap()),
        Err(StoreError::Corrupt(_))
    ));
}
