//! Tattoo demo entry point
//!
//! Hydrates a small session stencil from storage, attaches a persistor,
//! and applies a couple of state changes. Native builds store the blob in a
//! directory (first argument, default: `$TMPDIR/tattoo-demo`); web builds
//! use LocalStorage.

use std::sync::Arc;

use serde_json::json;
use tattoo::{PersistSettings, Persistor, Registry, Spec, Stencil, Storage, Store, Tree};

fn session_stencil() -> Stencil {
    Stencil::new()
        .field("token", Spec::marker(Tree::Null))
        .field("username", Spec::marker("unknown"))
        .field(
            "info",
            Spec::marker(Tree::from(json!({"telephone": null, "address": ""}))),
        )
        .field("theme", Spec::value("dark"))
}

fn run<S: Storage + Send + Sync + 'static>(storage: Arc<S>) -> tattoo::Result<()> {
    let settings = PersistSettings::default();
    let registry = Registry::new();

    let hydration = session_stencil().declare(Some("app"), &registry, &storage, &settings);
    for binding in hydration.bindings() {
        log::info!("{} <- {:?}", binding.path, binding.source);
    }

    let store = Store::new(Some(Tree::object().with("app", hydration.into_tree())));
    let attachment = tattoo::attach(&store, &Persistor::new(registry, storage.clone(), settings));

    store.update(|state| {
        state.set(
            "app",
            Tree::object()
                .with("token", Tree::Absent)
                .with("username", "foo")
                .with(
                    "info",
                    Tree::from(json!({"telephone": 90008000, "address": "camelcase str"})),
                )
                .with("theme", "light"),
        );
    })?;
    store.update(|state| {
        state.set(
            "app",
            Tree::object()
                .with("token", "the-token")
                .with("username", "batman")
                .with("info", Tree::Absent),
        );
    })?;
    attachment.detach(&store)?;

    if let Some(text) = storage.get(tattoo::DEFAULT_STORAGE_KEY)? {
        log::info!("Stored: {}", text);
    }
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Tattoo (native) starting...");

    let dir = std::env::args()
        .nth(1)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("tattoo-demo"));
    let storage = Arc::new(tattoo::FileStorage::new(dir));
    log::info!("Storage directory: {}", storage.dir().display());

    if let Err(e) = run(storage) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn wasm_main() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"Logger already initialized".into());
    }

    log::info!("Tattoo (web) starting...");
    if let Err(e) = run(Arc::new(tattoo::LocalStorage::new())) {
        log::error!("{}", e);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
