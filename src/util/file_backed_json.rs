use std::path::PathBuf;

use serde::{Serialize, de::DeserializeOwned};
use tokio::fs::{read_to_string, write, create_dir_all};

use crate::error::StoreError;

pub struct FileBackedValue<T> {
    value: T,
    path: PathBuf,
}
impl<T: Serialize + DeserializeOwned> FileBackedValue<T> {
    pub async fn new(path: PathBuf, default: impl FnOnce() -> T) -> Result<FileBackedValue<T>, StoreError> {
        // Use the stored value if there is one; otherwise make sure the directory exists for later writes.
        let value = if path.exists() {
            serde_json::from_str(&read_to_string(&path).await?)?
        } else {
            if let Some(parent) = path.parent() {
                create_dir_all(parent).await?;
            }
            default()
        };
        Ok(FileBackedValue {
            value,
            path
        })
    }
    pub fn get(&self) -> &T {
        &self.value
    }
    pub async fn mutate<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> Result<R, StoreError> {
        let result = f(&mut self.value);
        write(
            &self.path,
            serde_json::to_string_pretty(&self.value)?
        ).await?;
        Ok(result)
    }
}
