//! Integration tests for ID arrays as used by engine subsystems
//!
//! A subsystem owns its objects, registers their addresses and hands the
//! IDs out. These tests play that role through the public galaxy3d API.
//!
//! Run with: cargo test --test id_array_integration_tests

use galaxy_3d_ids::galaxy3d::ids::{Id, IdArray, IdArrayConfig, SharedIdArray, INVALID_ID};
use galaxy_3d_ids::galaxy3d::{Galaxy3dError, Galaxy3dResult};
use std::ptr::NonNull;
use std::sync::{Arc, Mutex};
use std::thread;

// ============================================================================
// TEST SUBSYSTEM: TEXTURE MANAGER
// ============================================================================

#[derive(Debug, PartialEq)]
struct Texture {
    name: String,
    width: u32,
    height: u32,
}

/// Owns textures; callers only ever see IDs
struct TextureManager {
    ids: IdArray<Texture>,
    textures: Vec<Box<Texture>>,
}

impl TextureManager {
    fn new() -> Galaxy3dResult<Self> {
        Ok(Self {
            ids: IdArray::with_config(IdArrayConfig::texture().with_growth_quantum(4))?,
            textures: Vec::new(),
        })
    }

    fn create(&mut self, name: &str, width: u32, height: u32) -> Id {
        let mut texture = Box::new(Texture { name: name.to_string(), width, height });
        let id = self.ids.register(NonNull::from(&mut *texture));
        if id != INVALID_ID {
            self.textures.push(texture);
        }
        id
    }

    fn size_of(&self, id: Id) -> Galaxy3dResult<(u32, u32)> {
        let texture = self.ids.resolve(id)?;
        // SAFETY: registered textures are boxed and owned by self.textures
        let texture = unsafe { texture.as_ref() };
        Ok((texture.width, texture.height))
    }

    fn destroy(&mut self, id: Id) -> Galaxy3dResult<()> {
        let texture = self.ids.resolve(id)?;
        self.ids.release(id);
        self.textures.retain(|owned| NonNull::from(&**owned) != texture);
        Ok(())
    }

    fn id_of(&self, texture: &Texture) -> Id {
        self.ids.find(NonNull::from(texture))
    }
}

impl Drop for TextureManager {
    fn drop(&mut self) {
        for id in self.ids.ids() {
            self.ids.release(id);
        }
        self.ids.clean();
    }
}

// ============================================================================
// SUBSYSTEM TESTS
// ============================================================================

#[test]
fn test_texture_manager_lifecycle() {
    let mut manager = TextureManager::new().unwrap();
    let albedo = manager.create("albedo", 512, 512);
    let normal = manager.create("normal", 256, 128);
    assert_eq!((albedo, normal), (1, 2));

    assert_eq!(manager.size_of(normal).unwrap(), (256, 128));
    assert!(matches!(manager.size_of(INVALID_ID), Err(Galaxy3dError::InvalidHandle(_))));

    manager.destroy(albedo).unwrap();
    assert!(manager.size_of(albedo).is_err());
    assert!(manager.destroy(albedo).is_err());

    // Lowest free ID is reused
    let roughness = manager.create("roughness", 64, 64);
    assert_eq!(roughness, albedo);
    assert_eq!(manager.textures.len(), 2);
}

#[test]
fn test_texture_manager_reverse_lookup() {
    let mut manager = TextureManager::new().unwrap();
    for i in 0..10 {
        manager.create(&format!("tile_{}", i), 16, 16);
    }
    let tile_7 = manager
        .textures
        .iter()
        .position(|t| t.name == "tile_7")
        .unwrap();
    let id = manager.id_of(&manager.textures[tile_7]);
    assert_eq!(id, 8);

    let stranger = Texture { name: "stranger".to_string(), width: 1, height: 1 };
    assert_eq!(manager.id_of(&stranger), INVALID_ID);
}

#[test]
fn test_texture_manager_cleanup_returns_to_empty() {
    let mut manager = TextureManager::new().unwrap();
    for i in 0..6 {
        manager.create(&format!("t{}", i), 8, 8);
    }
    assert_eq!(manager.ids.size(), 8);
    for id in manager.ids.ids() {
        manager.destroy(id).unwrap();
    }
    manager.ids.clean();
    assert_eq!(manager.ids.size(), 0);
    assert!(manager.textures.is_empty());
}

#[test]
fn test_texture_manager_behind_shared_lock() {
    let manager = Arc::new(Mutex::new(TextureManager::new().unwrap()));

    let workers: Vec<_> = (0..4)
        .map(|t| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                let mut manager = manager.lock().unwrap();
                manager.create(&format!("worker_{}", t), 32, 32)
            })
        })
        .collect();
    let mut created: Vec<Id> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    created.sort_unstable();
    assert_eq!(created, vec![1, 2, 3, 4]);

    let manager = manager.lock().unwrap();
    assert_eq!(manager.ids.len(), 4);
    assert_eq!(manager.size_of(3).unwrap(), (32, 32));
}

// ============================================================================
// TESTABLE PROPERTIES ACROSS BOTH VARIANTS
// ============================================================================

#[test]
fn test_both_variants_agree_on_allocation_order() {
    let objects: Vec<u32> = (0..40).collect();
    let mut simple = IdArray::new(6).unwrap();
    let shared = SharedIdArray::new(6).unwrap();

    for object in &objects {
        assert_eq!(simple.register(NonNull::from(object)), shared.register(NonNull::from(object)));
    }
    for id in [3, 17, 9, 33, 1] {
        simple.release(id);
        shared.release(id);
    }
    for object in &objects[..7] {
        let a = simple.register(NonNull::from(object));
        let b = shared.register(NonNull::from(object));
        assert_eq!(a, b);
    }
    assert_eq!(simple.ids(), shared.ids());

    for id in simple.ids() {
        simple.release(id);
        shared.release(id);
    }
}

#[test]
fn test_shared_array_across_subsystem_threads() {
    const THREADS: usize = 6;
    const PER_THREAD: usize = 150;

    let fences: Vec<Vec<u64>> = (0..THREADS)
        .map(|t| vec![t as u64; PER_THREAD])
        .collect();
    let mut ids = SharedIdArray::with_config(IdArrayConfig::sync_primitive().with_growth_quantum(10))
        .unwrap();

    let handles: Vec<Vec<Id>> = thread::scope(|scope| {
        let workers: Vec<_> = fences
            .iter()
            .map(|chunk| {
                let ids = &ids;
                scope.spawn(move || {
                    let handles: Vec<Id> =
                        chunk.iter().map(|f| ids.register(NonNull::from(f))).collect();
                    // Release every other fence while others keep registering
                    for id in handles.iter().step_by(2) {
                        ids.release(*id);
                    }
                    handles
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    let expected_live = THREADS * (PER_THREAD / 2);
    assert_eq!(ids.len() as usize, expected_live);
    for (chunk, chunk_handles) in fences.iter().zip(handles.iter()) {
        for (index, (fence, id)) in chunk.iter().zip(chunk_handles.iter()).enumerate() {
            if index % 2 == 0 {
                assert_eq!(ids.find(NonNull::from(fence)), INVALID_ID);
            } else {
                assert_eq!(ids.find(NonNull::from(fence)), *id);
                assert_eq!(ids.get(*id), Some(NonNull::from(fence)));
            }
        }
    }

    for id in ids.ids() {
        ids.release(id);
    }
    ids.clean();
    assert_eq!(ids.size(), 0);
    assert!(!ids.has_lock());
}
