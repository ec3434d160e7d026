//! GnuCash ledger handling.
//!
//! ```text
//! ledger/
//! ├── namespace  # NamespaceMap, streaming xmlns scan
//! ├── name       # ExpandedName, LedgerNames
//! ├── tree       # Element tree on top of quick-xml
//! ├── loader     # LedgerFile: gunzip + parse + locate book
//! ├── sanitize   # transaction / guid / schedule passes
//! └── serialize  # .xml and .gnucash output
//! ```

mod error;
mod loader;
mod name;
mod namespace;
mod sanitize;
mod serialize;
mod tree;


pub use loader::LedgerFile;
pub use sanitize::SanitizeReport;
pub use serialize::Serializer;
