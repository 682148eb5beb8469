#![no_std]

mod dirent;
mod error;

pub use self::{
    dirent::{CBM_NAME_LENGTH, CbmName, DirEntry, EntryFlag, FileType, NAME_PAD},
    error::Error,
};
