use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    models::{AvatarBlob, UserId},
    ports::{
        inbound::AvatarService,
        outbound::{StorageError, StorageProvider, UserDirectory},
    },
    AvatarError,
};

/// Internal serving prefix recognized when deciding whether an `image`
/// reference points at a blob we own. Anything else (externally hosted
/// avatars) is left alone in storage.
pub const PUBLIC_AVATAR_PREFIX: &str = "/api/avatars/";

const AVATAR_NAMESPACE: &str = "avatars";
const MAX_AVATAR_SIZE: usize = 5 * 1024 * 1024;

pub struct AvatarServiceImpl<D, S> {
    directory: Arc<D>,
    storage: Arc<S>,
}

impl<D, S> AvatarServiceImpl<D, S> {
    pub fn new(directory: Arc<D>, storage: Arc<S>) -> Self {
        Self { directory, storage }
    }
}

/// Derive the storage-relative path for an internally served avatar
/// reference. `None` when the reference is external, absent a filename,
/// or otherwise unrecognized.
fn storage_path(image: &str) -> Option<String> {
    if !image.starts_with(PUBLIC_AVATAR_PREFIX) {
        return None;
    }

    image
        .rsplit('/')
        .next()
        .filter(|filename| !filename.is_empty())
        .map(|filename| format!("{AVATAR_NAMESPACE}/{filename}"))
}

fn extension_for(content_type: &str) -> Option<&str> {
    let subtype = content_type.strip_prefix("image/")?;
    match subtype {
        "jpeg" => Some("jpg"),
        "svg+xml" => Some("svg"),
        other if other.chars().all(|c| c.is_ascii_alphanumeric()) => Some(other),
        _ => None,
    }
}

#[async_trait]
impl<D: UserDirectory, S: StorageProvider> AvatarService for AvatarServiceImpl<D, S> {
    async fn remove_avatar(&self, user_id: &UserId) -> Result<(), AvatarError> {
        let image = self.directory.find_user_image(user_id).await?;

        if let Some(path) = image.as_deref().and_then(storage_path) {
            // Best-effort cleanup. A failed blob delete must never keep
            // the directory reference alive.
            if let Err(err) = self.storage.delete_file(&path).await {
                tracing::warn!("Failed to delete avatar blob '{}': {}", path, err);
            }
        }

        self.directory.clear_user_image(user_id).await
    }

    async fn upload_avatar(
        &self,
        user_id: &UserId,
        image: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<(), AvatarError> {
        if image.is_empty() {
            return Err(AvatarError::InvalidImage);
        }
        if image.len() > MAX_AVATAR_SIZE {
            return Err(AvatarError::PayloadTooLarge);
        }

        let extension = content_type
            .as_deref()
            .and_then(extension_for)
            .ok_or(AvatarError::UnsupportedMediaType)?;

        // Resolve the user before touching storage so an unknown id
        // never leaves an orphaned blob behind.
        self.directory.find_user_image(user_id).await?;

        let filename = format!("{user_id}.{extension}");
        self.storage
            .put_file(&format!("{AVATAR_NAMESPACE}/{filename}"), &image)
            .await
            .map_err(|err| AvatarError::Storage(err.to_string()))?;

        self.directory
            .set_user_image(user_id, &format!("{PUBLIC_AVATAR_PREFIX}{filename}"))
            .await
    }

    async fn open_avatar(&self, filename: &str) -> Result<AvatarBlob, AvatarError> {
        let bytes = self
            .storage
            .read_file(&format!("{AVATAR_NAMESPACE}/{filename}"))
            .await
            .map_err(|err| match err {
                StorageError::NotFound(_) => AvatarError::NotFound,
                other => AvatarError::Storage(other.to_string()),
            })?;

        let mime_type = mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string();

        Ok(AvatarBlob::new(bytes, mime_type))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        io,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    use super::*;

    struct MockDirectory {
        users: Mutex<HashMap<UserId, Option<String>>>,
        clear_calls: AtomicUsize,
    }

    impl MockDirectory {
        fn new() -> Self {
            Self {
                users: Mutex::new(HashMap::new()),
                clear_calls: AtomicUsize::new(0),
            }
        }

        fn with_user(self, id: &str, image: Option<&str>) -> Self {
            self.users
                .lock()
                .unwrap()
                .insert(UserId::from(id), image.map(str::to_string));
            self
        }

        fn image_of(&self, id: &str) -> Option<String> {
            self.users
                .lock()
                .unwrap()
                .get(&UserId::from(id))
                .cloned()
                .flatten()
        }

        fn clear_calls(&self) -> usize {
            self.clear_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UserDirectory for MockDirectory {
        async fn find_user_image(&self, user_id: &UserId) -> Result<Option<String>, AvatarError> {
            self.users
                .lock()
                .unwrap()
                .get(user_id)
                .cloned()
                .ok_or(AvatarError::UserNotFound)
        }

        async fn clear_user_image(&self, user_id: &UserId) -> Result<(), AvatarError> {
            self.clear_calls.fetch_add(1, Ordering::SeqCst);
            self.users
                .lock()
                .unwrap()
                .insert(user_id.clone(), None);
            Ok(())
        }

        async fn set_user_image(&self, user_id: &UserId, image: &str) -> Result<(), AvatarError> {
            self.users
                .lock()
                .unwrap()
                .insert(user_id.clone(), Some(image.to_string()));
            Ok(())
        }
    }

    struct MockStorage {
        files: Mutex<HashMap<String, Vec<u8>>>,
        deleted: Mutex<Vec<String>>,
        fail_deletes: bool,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Mutex::new(HashMap::new()),
                deleted: Mutex::new(Vec::new()),
                fail_deletes: false,
            }
        }

        fn failing_deletes() -> Self {
            Self {
                fail_deletes: true,
                ..Self::new()
            }
        }

        fn with_file(self, path: &str, bytes: &[u8]) -> Self {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), bytes.to_vec());
            self
        }

        fn deleted_paths(&self) -> Vec<String> {
            self.deleted.lock().unwrap().clone()
        }

        fn stored_paths(&self) -> Vec<String> {
            let mut paths: Vec<_> = self.files.lock().unwrap().keys().cloned().collect();
            paths.sort();
            paths
        }
    }

    #[async_trait]
    impl StorageProvider for MockStorage {
        async fn put_file(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), bytes.to_vec());
            Ok(())
        }

        async fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(path.to_string()))
        }

        async fn delete_file(&self, path: &str) -> Result<(), StorageError> {
            self.deleted.lock().unwrap().push(path.to_string());
            if self.fail_deletes {
                return Err(StorageError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    "disk failure",
                )));
            }
            self.files.lock().unwrap().remove(path);
            Ok(())
        }
    }

    fn service(
        directory: MockDirectory,
        storage: MockStorage,
    ) -> (
        AvatarServiceImpl<MockDirectory, MockStorage>,
        Arc<MockDirectory>,
        Arc<MockStorage>,
    ) {
        let directory = Arc::new(directory);
        let storage = Arc::new(storage);
        (
            AvatarServiceImpl::new(Arc::clone(&directory), Arc::clone(&storage)),
            directory,
            storage,
        )
    }

    #[tokio::test]
    async fn removes_internal_avatar_blob_and_clears_reference() {
        let (service, directory, storage) = service(
            MockDirectory::new().with_user("alice", Some("/api/avatars/foo.png")),
            MockStorage::new().with_file("avatars/foo.png", b"img"),
        );

        service.remove_avatar(&UserId::from("alice")).await.unwrap();

        assert_eq!(storage.deleted_paths(), vec!["avatars/foo.png"]);
        assert_eq!(directory.image_of("alice"), None);
    }

    #[tokio::test]
    async fn external_avatar_is_cleared_but_never_deleted_from_storage() {
        let (service, directory, storage) = service(
            MockDirectory::new().with_user("alice", Some("https://example.com/x.png")),
            MockStorage::new(),
        );

        service.remove_avatar(&UserId::from("alice")).await.unwrap();

        assert!(storage.deleted_paths().is_empty());
        assert_eq!(directory.image_of("alice"), None);
    }

    #[tokio::test]
    async fn user_without_avatar_still_succeeds() {
        let (service, directory, storage) =
            service(MockDirectory::new().with_user("alice", None), MockStorage::new());

        service.remove_avatar(&UserId::from("alice")).await.unwrap();

        assert!(storage.deleted_paths().is_empty());
        assert_eq!(directory.image_of("alice"), None);
        assert_eq!(directory.clear_calls(), 1);
    }

    #[tokio::test]
    async fn storage_failure_is_swallowed_and_reference_still_cleared() {
        let (service, directory, storage) = service(
            MockDirectory::new().with_user("alice", Some("/api/avatars/foo.png")),
            MockStorage::failing_deletes(),
        );

        service.remove_avatar(&UserId::from("alice")).await.unwrap();

        assert_eq!(storage.deleted_paths(), vec!["avatars/foo.png"]);
        assert_eq!(directory.image_of("alice"), None);
    }

    #[tokio::test]
    async fn unknown_user_yields_not_found_without_mutation() {
        let (service, directory, storage) = service(MockDirectory::new(), MockStorage::new());

        let result = service.remove_avatar(&UserId::from("ghost")).await;

        assert!(matches!(result, Err(AvatarError::UserNotFound)));
        assert!(storage.deleted_paths().is_empty());
        assert_eq!(directory.clear_calls(), 0);
    }

    #[tokio::test]
    async fn removal_is_idempotent() {
        let (service, directory, storage) = service(
            MockDirectory::new().with_user("alice", Some("/api/avatars/foo.png")),
            MockStorage::new().with_file("avatars/foo.png", b"img"),
        );

        service.remove_avatar(&UserId::from("alice")).await.unwrap();
        service.remove_avatar(&UserId::from("alice")).await.unwrap();

        // The second call finds no internal reference, so storage is only
        // touched once.
        assert_eq!(storage.deleted_paths(), vec!["avatars/foo.png"]);
        assert_eq!(directory.image_of("alice"), None);
        assert_eq!(directory.clear_calls(), 2);
    }

    #[tokio::test]
    async fn prefix_without_filename_skips_storage() {
        let (service, directory, storage) = service(
            MockDirectory::new().with_user("alice", Some("/api/avatars/")),
            MockStorage::new(),
        );

        service.remove_avatar(&UserId::from("alice")).await.unwrap();

        assert!(storage.deleted_paths().is_empty());
        assert_eq!(directory.image_of("alice"), None);
    }

    #[tokio::test]
    async fn upload_stores_blob_and_updates_reference() {
        let (service, directory, storage) = service(
            MockDirectory::new().with_user("alice", None),
            MockStorage::new(),
        );

        service
            .upload_avatar(
                &UserId::from("alice"),
                b"img".to_vec(),
                Some("image/png".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(storage.stored_paths(), vec!["avatars/alice.png"]);
        assert_eq!(
            directory.image_of("alice"),
            Some("/api/avatars/alice.png".to_string())
        );
    }

    #[tokio::test]
    async fn upload_rejects_non_image_payloads() {
        let (service, _, storage) = service(
            MockDirectory::new().with_user("alice", None),
            MockStorage::new(),
        );

        let result = service
            .upload_avatar(
                &UserId::from("alice"),
                b"%PDF".to_vec(),
                Some("application/pdf".to_string()),
            )
            .await;

        assert!(matches!(result, Err(AvatarError::UnsupportedMediaType)));
        assert!(storage.stored_paths().is_empty());
    }

    #[tokio::test]
    async fn upload_rejects_oversized_payloads() {
        let (service, _, storage) = service(
            MockDirectory::new().with_user("alice", None),
            MockStorage::new(),
        );

        let result = service
            .upload_avatar(
                &UserId::from("alice"),
                vec![0; MAX_AVATAR_SIZE + 1],
                Some("image/png".to_string()),
            )
            .await;

        assert!(matches!(result, Err(AvatarError::PayloadTooLarge)));
        assert!(storage.stored_paths().is_empty());
    }

    #[tokio::test]
    async fn upload_for_unknown_user_leaves_no_blob_behind() {
        let (service, _, storage) = service(MockDirectory::new(), MockStorage::new());

        let result = service
            .upload_avatar(
                &UserId::from("ghost"),
                b"img".to_vec(),
                Some("image/png".to_string()),
            )
            .await;

        assert!(matches!(result, Err(AvatarError::UserNotFound)));
        assert!(storage.stored_paths().is_empty());
    }

    #[tokio::test]
    async fn open_avatar_returns_bytes_with_guessed_mime_type() {
        let (service, _, _) = service(
            MockDirectory::new(),
            MockStorage::new().with_file("avatars/foo.png", b"img"),
        );

        let blob = service.open_avatar("foo.png").await.unwrap();

        assert_eq!(blob.bytes, b"img");
        assert_eq!(blob.mime_type, "image/png");
    }

    #[tokio::test]
    async fn open_missing_avatar_yields_not_found() {
        let (service, _, _) = service(MockDirectory::new(), MockStorage::new());

        let result = service.open_avatar("foo.png").await;

        assert!(matches!(result, Err(AvatarError::NotFound)));
    }

    #[test]
    fn storage_path_recognizes_only_the_internal_prefix() {
        assert_eq!(
            storage_path("/api/avatars/foo.png").as_deref(),
            Some("avatars/foo.png")
        );
        assert_eq!(storage_path("/api/avatars/"), None);
        assert_eq!(storage_path("https://example.com/x.png"), None);
        assert_eq!(storage_path("/uploads/foo.png"), None);
    }
}
