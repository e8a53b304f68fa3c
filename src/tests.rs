#[allow(clippy::module_inception)]
mod tests {
    use crate::app::Dialog;
    use crate::manager::{AppEvent, FileManager};
    use crate::push::PushMessage;
    use crate::service::device::{DeviceApi, DeviceError, FileEntry, Listing, UploadFile};
    use async_trait::async_trait;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        List(String),
        Upload(usize),
        CreateFolder(String),
        DeleteFolder(String),
        DeleteFile(String),
        Download(String),
        Reboot,
    }

    /// Records every request and serves canned listings per folder.
    struct RecordingDevice {
        calls: Mutex<Vec<Call>>,
        listings: Mutex<HashMap<String, Listing>>,
        fail_listing: AtomicBool,
        download_body: Vec<u8>,
    }

    impl RecordingDevice {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                listings: Mutex::new(HashMap::new()),
                fail_listing: AtomicBool::new(false),
                download_body: b"payload".to_vec(),
            }
        }

        fn set_listing(&self, folder: &str, entries: &[(&str, bool, u64)]) {
            let listing = Listing {
                files: entries
                    .iter()
                    .map(|(name, is_dir, size)| FileEntry {
                        name: (*name).to_string(),
                        is_dir: *is_dir,
                        size: *size,
                    })
                    .collect(),
                total_space: 1_048_576,
                used_space: 4096,
            };
            self.listings.lock().unwrap().insert(folder.to_string(), listing);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn count<F: Fn(&Call) -> bool>(&self, pred: F) -> usize {
            self.calls().into_iter().filter(|c| pred(c)).count()
        }
    }

    #[async_trait]
    impl DeviceApi for RecordingDevice {
        async fn list(&self, folder: &str) -> Result<Listing, DeviceError> {
            self.record(Call::List(folder.to_string()));
            if self.fail_listing.load(Ordering::SeqCst) {
                return Err(DeviceError::Status(StatusCode::INTERNAL_SERVER_ERROR));
            }
            Ok(self
                .listings
                .lock()
                .unwrap()
                .get(folder)
                .cloned()
                .unwrap_or_default())
        }

        async fn upload(&self, files: Vec<UploadFile>) -> Result<(), DeviceError> {
            self.record(Call::Upload(files.len()));
            Ok(())
        }

        async fn create_folder(&self, name: &str) -> Result<(), DeviceError> {
            self.record(Call::CreateFolder(name.to_string()));
            Ok(())
        }

        async fn delete_folder(&self, name: &str) -> Result<(), DeviceError> {
            self.record(Call::DeleteFolder(name.to_string()));
            Ok(())
        }

        async fn delete_file(&self, path: &str) -> Result<(), DeviceError> {
            self.record(Call::DeleteFile(path.to_string()));
            Ok(())
        }

        async fn download(&self, path: &str) -> Result<Vec<u8>, DeviceError> {
            self.record(Call::Download(path.to_string()));
            Ok(self.download_body.clone())
        }

        async fn reboot(&self) -> Result<(), DeviceError> {
            self.record(Call::Reboot);
            Ok(())
        }
    }

    fn setup(
        device: &Arc<RecordingDevice>,
        download_dir: PathBuf,
    ) -> (FileManager, mpsc::Receiver<AppEvent>) {
        FileManager::new(Arc::clone(device) as Arc<dyn DeviceApi>, download_dir)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn step(manager: &mut FileManager, events: &mut mpsc::Receiver<AppEvent>) {
        let event = events.recv().await.expect("an event to arrive");
        manager.handle_event(event);
    }

    #[tokio::test]
    async fn refresh_populates_view_and_probes_folders() {
        let device = Arc::new(RecordingDevice::new());
        device.set_listing("/", &[("sub", true, 0), ("a.txt", false, 2048)]);
        device.set_listing("/sub/", &[]);
        let (mut manager, mut events) = setup(&device, PathBuf::from("."));

        manager.refresh_listing();
        step(&mut manager, &mut events).await; // listing
        step(&mut manager, &mut events).await; // probe of "sub"

        let names: Vec<&str> = manager.app.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["sub", "a.txt"]);
        assert!(manager.app.entries[0].delete_enabled); // probed empty
        assert_eq!(manager.app.used_space, 4096);
        assert_eq!(device.calls(), vec![
            Call::List("/".to_string()),
            Call::List("/sub/".to_string()),
        ]);
    }

    #[tokio::test]
    async fn non_empty_precheck_blocks_folder_delete() {
        let device = Arc::new(RecordingDevice::new());
        device.set_listing("/", &[("sub", true, 0)]);
        device.set_listing("/sub/", &[("inner.txt", false, 10)]);
        let (mut manager, mut events) = setup(&device, PathBuf::from("."));

        manager.refresh_listing();
        step(&mut manager, &mut events).await;
        step(&mut manager, &mut events).await;
        assert!(!manager.app.entries[0].delete_enabled);

        manager.request_delete_folder("sub");
        step(&mut manager, &mut events).await; // delete pre-check

        assert_eq!(manager.app.dialog, None);
        assert!(!manager.app.entries[0].delete_enabled);
        assert!(manager.app.warning.is_some());
        assert_eq!(device.count(|c| matches!(c, Call::DeleteFolder(_))), 0);
    }

    #[tokio::test]
    async fn empty_folder_delete_confirms_then_posts_bare_name() {
        let device = Arc::new(RecordingDevice::new());
        device.set_listing("/", &[("sub", true, 0)]);
        device.set_listing("/sub/", &[]);
        let (mut manager, mut events) = setup(&device, PathBuf::from("."));

        manager.request_delete_folder("sub");
        step(&mut manager, &mut events).await; // pre-check came back empty
        assert_eq!(
            manager.app.dialog,
            Some(Dialog::ConfirmDeleteFolder { name: "sub".to_string() })
        );

        manager.handle_key(key(KeyCode::Char('y')));
        step(&mut manager, &mut events).await; // folder deleted
        step(&mut manager, &mut events).await; // follow-up refresh

        assert_eq!(device.count(|c| *c == Call::DeleteFolder("sub".to_string())), 1);
        assert_eq!(device.count(|c| *c == Call::List("/".to_string())), 1);
    }

    #[tokio::test]
    async fn declined_confirmation_issues_nothing() {
        let device = Arc::new(RecordingDevice::new());
        let (mut manager, _events) = setup(&device, PathBuf::from("."));

        manager.request_delete_file("a.txt");
        manager.handle_key(key(KeyCode::Char('n')));
        assert_eq!(manager.app.dialog, None);

        manager.request_reboot();
        manager.handle_key(key(KeyCode::Esc));
        assert_eq!(manager.app.dialog, None);

        assert!(device.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_file_posts_the_full_path() {
        let device = Arc::new(RecordingDevice::new());
        let (mut manager, mut events) = setup(&device, PathBuf::from("."));
        manager.app.folder.push("data");

        manager.request_delete_file("a.txt");
        manager.handle_key(key(KeyCode::Char('y')));
        step(&mut manager, &mut events).await; // deleted
        step(&mut manager, &mut events).await; // refresh

        assert_eq!(
            device.calls(),
            vec![
                Call::DeleteFile("/data/a.txt".to_string()),
                Call::List("/data/".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn upload_batch_is_one_request_and_one_refresh() {
        let dir = TempDir::new().unwrap();
        let mut paths = Vec::new();
        for name in ["one.bin", "two.bin", "three.bin"] {
            let path = dir.path().join(name);
            std::fs::write(&path, b"data").unwrap();
            paths.push(path);
        }

        let device = Arc::new(RecordingDevice::new());
        let (mut manager, mut events) = setup(&device, PathBuf::from("."));

        manager.upload(paths);
        step(&mut manager, &mut events).await; // upload finished
        step(&mut manager, &mut events).await; // the single refresh

        assert_eq!(
            device.calls(),
            vec![Call::Upload(3), Call::List("/".to_string())]
        );
    }

    #[tokio::test]
    async fn unreadable_upload_batch_sends_no_request() {
        let device = Arc::new(RecordingDevice::new());
        let (mut manager, mut events) = setup(&device, PathBuf::from("."));

        manager.upload(vec![PathBuf::from("/definitely/not/here.bin")]);
        step(&mut manager, &mut events).await; // upload failed locally

        assert!(device.calls().is_empty());
    }

    #[tokio::test]
    async fn push_trigger_file_list_refreshes_once_without_moving() {
        let device = Arc::new(RecordingDevice::new());
        let (mut manager, mut events) = setup(&device, PathBuf::from("."));
        manager.app.folder.push("data");

        manager.handle_push(PushMessage::TriggerFileList);
        step(&mut manager, &mut events).await;

        assert_eq!(manager.app.folder.as_str(), "/data/");
        assert_eq!(device.calls(), vec![Call::List("/data/".to_string())]);
    }

    #[tokio::test]
    async fn push_commands_open_the_matching_dialog() {
        let device = Arc::new(RecordingDevice::new());
        let (mut manager, _events) = setup(&device, PathBuf::from("."));

        manager.handle_push(PushMessage::TriggerUpload);
        assert!(matches!(
            manager.app.dialog,
            Some(Dialog::UploadPathPrompt { .. })
        ));

        manager.handle_push(PushMessage::CreateFolder);
        assert!(matches!(
            manager.app.dialog,
            Some(Dialog::FolderNamePrompt { .. })
        ));

        manager.handle_push(PushMessage::Reboot);
        assert_eq!(manager.app.dialog, Some(Dialog::ConfirmReboot));

        assert!(device.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_folder_name_prompt_aborts_silently() {
        let device = Arc::new(RecordingDevice::new());
        let (mut manager, _events) = setup(&device, PathBuf::from("."));

        manager.handle_push(PushMessage::CreateFolder);
        manager.handle_key(key(KeyCode::Char(' ')));
        manager.handle_key(key(KeyCode::Enter));

        assert_eq!(manager.app.dialog, None);
        assert!(device.calls().is_empty());
    }

    #[tokio::test]
    async fn typed_folder_name_is_submitted_and_refreshes() {
        let device = Arc::new(RecordingDevice::new());
        let (mut manager, mut events) = setup(&device, PathBuf::from("."));

        manager.handle_push(PushMessage::CreateFolder);
        for c in "logs".chars() {
            manager.handle_key(key(KeyCode::Char(c)));
        }
        manager.handle_key(key(KeyCode::Enter));
        step(&mut manager, &mut events).await; // created
        step(&mut manager, &mut events).await; // refresh

        assert_eq!(
            device.calls(),
            vec![
                Call::CreateFolder("logs".to_string()),
                Call::List("/".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn download_saves_into_the_download_dir() {
        let dir = TempDir::new().unwrap();
        let device = Arc::new(RecordingDevice::new());
        let (mut manager, mut events) = setup(&device, dir.path().to_path_buf());
        manager.app.folder.push("data");

        manager.download("fw.bin");
        step(&mut manager, &mut events).await;

        assert_eq!(device.calls(), vec![Call::Download("/data/fw.bin".to_string())]);
        let saved = std::fs::read(dir.path().join("fw.bin")).unwrap();
        assert_eq!(saved, b"payload");
    }

    #[tokio::test]
    async fn failed_refresh_leaves_the_previous_view() {
        let device = Arc::new(RecordingDevice::new());
        device.set_listing("/", &[("keep.txt", false, 1)]);
        let (mut manager, mut events) = setup(&device, PathBuf::from("."));

        manager.refresh_listing();
        step(&mut manager, &mut events).await;
        assert_eq!(manager.app.entries.len(), 1);

        device.fail_listing.store(true, Ordering::SeqCst);
        manager.refresh_listing();
        step(&mut manager, &mut events).await;

        assert_eq!(manager.app.entries[0].name, "keep.txt");
    }

    #[tokio::test]
    async fn stale_listing_completion_is_discarded() {
        let device = Arc::new(RecordingDevice::new());
        device.set_listing("/", &[("current.txt", false, 1)]);
        let (mut manager, mut events) = setup(&device, PathBuf::from("."));

        manager.refresh_listing();
        let stale_generation = manager.app.generation;
        step(&mut manager, &mut events).await;

        manager.refresh_listing();
        step(&mut manager, &mut events).await;

        // A slow response from the first render generation arrives last.
        manager.handle_event(AppEvent::ListingLoaded {
            generation: stale_generation,
            folder: manager.app.folder.clone(),
            result: Ok(Listing {
                files: vec![FileEntry {
                    name: "stale.txt".to_string(),
                    is_dir: false,
                    size: 1,
                }],
                total_space: 1,
                used_space: 1,
            }),
        });

        assert_eq!(manager.app.entries[0].name, "current.txt");
    }

    #[tokio::test]
    async fn delete_check_finishing_after_navigation_is_discarded() {
        let device = Arc::new(RecordingDevice::new());
        device.set_listing("/", &[("root.txt", false, 1)]);
        device.set_listing("/data/", &[("sub", true, 0)]);
        device.set_listing("/data/sub/", &[]);
        let (mut manager, mut events) = setup(&device, PathBuf::from("."));
        manager.app.folder.push("data");

        manager.refresh_listing();
        step(&mut manager, &mut events).await; // listing of /data/
        step(&mut manager, &mut events).await; // probe of "sub"

        // The check is still in flight when the view moves up to root.
        manager.request_delete_folder("sub");
        manager.navigate_up();
        step(&mut manager, &mut events).await; // the outdated check
        step(&mut manager, &mut events).await; // listing of /

        assert!(manager.app.folder.is_root());
        assert_eq!(manager.app.dialog, None);
        manager.handle_key(key(KeyCode::Char('y')));
        assert_eq!(device.count(|c| matches!(c, Call::DeleteFolder(_))), 0);
    }

    #[tokio::test]
    async fn upload_prompt_splits_on_semicolons_not_spaces() {
        let dir = TempDir::new().unwrap();
        let spaced = dir.path().join("boot log.txt");
        let plain = dir.path().join("fw.bin");
        std::fs::write(&spaced, b"data").unwrap();
        std::fs::write(&plain, b"data").unwrap();

        let device = Arc::new(RecordingDevice::new());
        let (mut manager, mut events) = setup(&device, PathBuf::from("."));

        manager.handle_push(PushMessage::TriggerUpload);
        let input = format!("{}; {}", spaced.display(), plain.display());
        for c in input.chars() {
            manager.handle_key(key(KeyCode::Char(c)));
        }
        manager.handle_key(key(KeyCode::Enter));
        step(&mut manager, &mut events).await; // upload finished
        step(&mut manager, &mut events).await; // refresh

        assert_eq!(
            device.calls(),
            vec![Call::Upload(2), Call::List("/".to_string())]
        );
    }

    #[tokio::test]
    async fn reboot_flow_blocks_then_returns_to_root() {
        let device = Arc::new(RecordingDevice::new());
        let (mut manager, mut events) = setup(&device, PathBuf::from("."));
        manager.app.folder.push("data");

        manager.request_reboot();
        assert_eq!(manager.app.dialog, Some(Dialog::ConfirmReboot));
        manager.handle_key(key(KeyCode::Char('y')));
        step(&mut manager, &mut events).await; // reboot acknowledged
        assert_eq!(manager.app.dialog, Some(Dialog::RebootNotice));
        assert_eq!(device.calls(), vec![Call::Reboot]);

        // Skip the restart grace period.
        manager.handle_event(AppEvent::RebootWaitElapsed);
        step(&mut manager, &mut events).await; // refresh of root

        assert_eq!(manager.app.dialog, None);
        assert!(manager.app.folder.is_root());
        assert_eq!(device.count(|c| *c == Call::List("/".to_string())), 1);
    }
}
