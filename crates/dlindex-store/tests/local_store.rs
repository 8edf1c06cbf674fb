use dlindex_store::{LocalStore, ObjectStore, PutOptions};
use dlindex_util::hash::md5_hex;
use tempfile::TempDir;

fn seed(root: &std::path::Path, key: &str, data: &[u8]) {
    let path = root.join(key);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, data).unwrap();
}

#[tokio::test]
async fn test_list_returns_keys_under_prefix_sorted() {
    let tmp = TempDir::new().unwrap();
    seed(tmp.path(), "cli/releases/binaries/dcos/linux/x86-64/0.8.0/dcos", b"elf");
    seed(tmp.path(), "cli/releases/binaries/dcos/darwin/x86-64/0.8.0/dcos", b"macho");
    seed(tmp.path(), "cli/releases/binaries/dcos-other/linux/x86-64/1.0.0/dcos", b"x");
    seed(tmp.path(), "cli/index.html", b"<html>");

    let store = LocalStore::new(tmp.path());
    let objects = store.list("cli/releases/binaries/dcos").await.unwrap();
    let keys: Vec<_> = objects.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "cli/releases/binaries/dcos/darwin/x86-64/0.8.0/dcos",
            "cli/releases/binaries/dcos/linux/x86-64/0.8.0/dcos",
        ]
    );
    assert_eq!(objects[0].size, 5);
    assert!(objects[0].last_modified.is_some());
}

#[tokio::test]
async fn test_list_empty_prefix_lists_everything() {
    let tmp = TempDir::new().unwrap();
    seed(tmp.path(), "a/b", b"1");
    seed(tmp.path(), "c", b"2");
    let store = LocalStore::new(tmp.path());
    assert_eq!(store.list("").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_missing_prefix_is_empty() {
    let tmp = TempDir::new().unwrap();
    let store = LocalStore::new(tmp.path());
    assert!(store.list("nothing/here").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_put_get_head() {
    let tmp = TempDir::new().unwrap();
    let store = LocalStore::new(tmp.path());
    let opts = PutOptions {
        content_type: Some("text/html; charset=utf-8".to_string()),
        cache_control: None,
    };

    assert!(store.get("cli/index.html").await.unwrap().is_none());
    assert!(store.head("cli/index.html").await.unwrap().is_none());

    store.put("cli/index.html", b"<html>v1</html>", &opts).await.unwrap();
    assert_eq!(
        store.get("cli/index.html").await.unwrap().unwrap(),
        b"<html>v1</html>"
    );

    let head = store.head("cli/index.html").await.unwrap().unwrap();
    assert_eq!(head.size, 15);
    assert_eq!(head.etag.as_deref(), Some(md5_hex(b"<html>v1</html>").as_str()));

    store.put("cli/index.html", b"v2", &opts).await.unwrap();
    assert_eq!(store.get("cli/index.html").await.unwrap().unwrap(), b"v2");
    assert_eq!(store.list("cli").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_put_rejects_escaping_key() {
    let tmp = TempDir::new().unwrap();
    let store = LocalStore::new(tmp.path().join("bucket"));
    let err = store
        .put("../outside", b"x", &PutOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Invalid object key"), "{err}");
    assert!(!tmp.path().join("outside").exists());
}

#[tokio::test]
async fn test_describe() {
    let store = LocalStore::new("/srv/bucket");
    assert_eq!(store.describe(), "file:///srv/bucket");
}
