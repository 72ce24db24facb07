pub mod authors;
pub mod books;

use std::sync::Arc;

use catalog_kernel::ModuleRegistry;
use catalog_store::Table;

/// Register all catalog modules with the registry.
///
/// The author table is shared with the books module so book payloads can
/// check the author ids they reference.
pub fn register_all(registry: &mut ModuleRegistry) {
    let authors = Arc::new(Table::new());
    let books = Arc::new(Table::new());

    registry.register(authors::create_module(authors.clone()));
    registry.register(books::create_module(books, authors));
}
