/// An avatar blob as read back from storage, ready to serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarBlob {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl AvatarBlob {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }
}
