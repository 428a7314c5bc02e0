//! # Selection
//!
//! GPU picking support. Every registered selectable gets a unique flat color.
//! During a selection pass each selectable draws itself in that color with
//! shading disabled, the renderer reads back the pixel under the pick point
//! and [`SelectionManager::select_item_with_color`] maps it back to its owner.
//!
//! ## Color allocation
//!
//! Colors come from a free pool that is refilled in chunks from a counter.
//! The counter increments red first, carrying into green and then blue.
//! Freed colors go back to the pool and are handed out again before new ones
//! are generated.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use slotmap::{new_key_type, SlotMap};
use thiserror::Error;

use crate::config::SelectionConfig;

new_key_type! {
    /// Handle of a registered selectable
    pub struct SelectableKey;
}

/// Flat 24-bit pick color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PickColor {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl PickColor {
    /// Color the picking framebuffer is cleared to; never assigned
    pub const BACKGROUND: Self = Self::new(0, 0, 0);

    /// Create a color from channel bytes
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Color from an RGBA pixel read back from the framebuffer; alpha is ignored
    pub const fn from_rgba_bytes(pixel: [u8; 4]) -> Self {
        Self::new(pixel[0], pixel[1], pixel[2])
    }

    /// Normalized RGBA with full alpha, as submitted to the graphics context
    pub fn to_rgba_f32(self) -> [f32; 4] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            1.0,
        ]
    }
}

impl fmt::Display for PickColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Highlight color for the currently selected item
pub const SELECTED_COLOR: [f32; 4] = [0.25, 0.55, 0.35, 1.0];

/// Selection errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// All 24-bit colors are in use
    #[error("Selection manager is out of colors to generate")]
    ColorsExhausted,

    /// The key does not name a registered selectable
    #[error("Unknown selectable")]
    UnknownSelectable,
}

/// An object that can be picked in the selection pass.
///
/// Selectables are shared between the layer that draws them and the
/// selection manager, so selection state is set through `&self`.
pub trait Selectable: Send + Sync {
    /// Mark the object selected or deselected
    fn set_selected(&self, selected: bool);

    /// Key/value description shown for the selected object
    fn info(&self) -> BTreeMap<String, String>;
}

/// Counter producing the color sequence (2,1,1), (3,1,1), ... (255,1,1), (0,2,1), ...
#[derive(Debug, Clone)]
struct ColorGenerator {
    r: u16,
    g: u16,
    b: u16,
}

impl ColorGenerator {
    const fn new() -> Self {
        Self { r: 1, g: 1, b: 1 }
    }

    fn next_color(&mut self) -> Option<PickColor> {
        if self.b > 255 {
            return None;
        }
        self.r += 1;
        if self.r == 256 {
            self.g += 1;
            self.r = 0;
        }
        if self.g == 256 {
            self.b += 1;
            self.g = 0;
        }
        match (u8::try_from(self.r), u8::try_from(self.g), u8::try_from(self.b)) {
            (Ok(r), Ok(g), Ok(b)) => Some(PickColor::new(r, g, b)),
            _ => None,
        }
    }
}

struct Registration {
    item: Arc<dyn Selectable>,
    color: PickColor,
}

/// Allocates pick colors and tracks the current selection
pub struct SelectionManager {
    registrations: SlotMap<SelectableKey, Registration>,
    by_color: HashMap<PickColor, SelectableKey>,
    pool: VecDeque<PickColor>,
    generator: ColorGenerator,
    chunk_size: usize,

    selected: Option<SelectableKey>,
    selection_draw: bool,
    selection_point: (i32, i32),
}

impl fmt::Debug for SelectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionManager")
            .field("registered", &self.registrations.len())
            .field("pool", &self.pool.len())
            .field("selected", &self.selected)
            .field("selection_draw", &self.selection_draw)
            .field("selection_point", &self.selection_point)
            .finish()
    }
}

impl Default for SelectionManager {
    fn default() -> Self {
        Self::new(&SelectionConfig::default())
    }
}

impl SelectionManager {
    /// Create a manager with one chunk of colors ready
    pub fn new(config: &SelectionConfig) -> Self {
        let mut manager = Self {
            registrations: SlotMap::with_key(),
            by_color: HashMap::new(),
            pool: VecDeque::new(),
            generator: ColorGenerator::new(),
            chunk_size: config.color_chunk_size.max(1),
            selected: None,
            selection_draw: false,
            selection_point: (-1, -1),
        };
        manager.generate_colors();
        manager
    }

    /// Register a selectable and assign it a unique color
    pub fn register_selectable(
        &mut self,
        item: Arc<dyn Selectable>,
    ) -> Result<(SelectableKey, PickColor), SelectionError> {
        let color = self.next_color()?;
        let key = self.registrations.insert(Registration { item, color });
        self.by_color.insert(color, key);
        log::debug!("Registered selectable with color {}", color);
        Ok((key, color))
    }

    /// Release a selectable's color for reuse.
    ///
    /// Returns the background color, which the caller should draw the object
    /// with from now on. Removing the selected item clears the selection.
    pub fn remove_selectable(&mut self, key: SelectableKey) -> PickColor {
        if let Some(registration) = self.registrations.remove(key) {
            self.by_color.remove(&registration.color);
            self.pool.push_back(registration.color);
            if self.selected == Some(key) {
                registration.item.set_selected(false);
                self.selected = None;
            }
        }
        PickColor::BACKGROUND
    }

    /// Enter selection draw mode for a pick at screen coordinates `(x, y)`
    pub fn begin_selection_draw(&mut self, x: i32, y: i32) {
        self.selection_draw = true;
        self.selection_point = (x, y);
    }

    /// Leave selection draw mode without changing the selection
    pub fn cancel_selection_draw(&mut self) {
        self.selection_draw = false;
    }

    /// Whether the next frame should run the selection pass
    pub fn is_selection_draw(&self) -> bool {
        self.selection_draw
    }

    /// Screen coordinates of the last pick request
    pub fn selection_point(&self) -> (i32, i32) {
        self.selection_point
    }

    /// Resolve a color read back from the selection pass.
    ///
    /// Leaves selection draw mode. When the color belongs to a selectable it
    /// becomes the selection (the previous one is deselected) and `true` is
    /// returned; otherwise the current selection is cleared.
    pub fn select_item_with_color(&mut self, color: PickColor) -> bool {
        self.selection_draw = false;

        let Some(&key) = self.by_color.get(&color) else {
            self.deselect();
            return false;
        };

        if self.selected != Some(key) {
            self.deselect();
            if let Some(registration) = self.registrations.get(key) {
                registration.item.set_selected(true);
            }
            self.selected = Some(key);
            log::debug!("Selected item with color {}", color);
        }
        true
    }

    /// Color assigned to a selectable
    pub fn color_of(&self, key: SelectableKey) -> Result<PickColor, SelectionError> {
        self.registrations
            .get(key)
            .map(|registration| registration.color)
            .ok_or(SelectionError::UnknownSelectable)
    }

    /// Key of the current selection
    pub fn selected_item(&self) -> Option<SelectableKey> {
        self.selected
    }

    /// Description of the current selection
    pub fn selected_info(&self) -> Option<BTreeMap<String, String>> {
        self.selected
            .and_then(|key| self.registrations.get(key))
            .map(|registration| registration.item.info())
    }

    /// Number of registered selectables
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    fn deselect(&mut self) {
        if let Some(key) = self.selected.take() {
            if let Some(registration) = self.registrations.get(key) {
                registration.item.set_selected(false);
            }
        }
    }

    fn next_color(&mut self) -> Result<PickColor, SelectionError> {
        if self.pool.is_empty() {
            self.generate_colors();
        }
        self.pool.pop_front().ok_or_else(|| {
            log::error!("{}", SelectionError::ColorsExhausted);
            SelectionError::ColorsExhausted
        })
    }

    fn generate_colors(&mut self) {
        for _ in 0..self.chunk_size {
            match self.generator.next_color() {
                Some(color) => self.pool.push_back(color),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Marker {
        name: String,
        selected: AtomicBool,
    }

    impl Marker {
        fn named(name: &str) -> Arc<Self> {
            Arc::new(Self { name: name.to_string(), selected: AtomicBool::new(false) })
        }

        fn is_selected(&self) -> bool {
            self.selected.load(Ordering::SeqCst)
        }
    }

    impl Selectable for Marker {
        fn set_selected(&self, selected: bool) {
            self.selected.store(selected, Ordering::SeqCst);
        }

        fn info(&self) -> BTreeMap<String, String> {
            BTreeMap::from([("name".to_string(), self.name.clone())])
        }
    }

    #[test]
    fn test_color_sequence() {
        let mut generator = ColorGenerator::new();
        assert_eq!(generator.next_color(), Some(PickColor::new(2, 1, 1)));
        for _ in 0..253 {
            generator.next_color();
        }
        assert_eq!(generator.next_color(), Some(PickColor::new(0, 2, 1)));
    }

    #[test]
    fn test_color_space_exhaustion() {
        let mut generator = ColorGenerator { r: 255, g: 255, b: 255 };
        assert_eq!(generator.next_color(), None);

        let mut manager = SelectionManager::new(&SelectionConfig { color_chunk_size: 4 });
        manager.pool.clear();
        manager.generator = ColorGenerator { r: 254, g: 255, b: 255 };
        let (_, last) = manager.register_selectable(Marker::named("last")).unwrap();
        assert_eq!(last, PickColor::new(255, 255, 255));
        assert_eq!(
            manager.register_selectable(Marker::named("overflow")).unwrap_err(),
            SelectionError::ColorsExhausted
        );
    }

    #[test]
    fn test_registered_colors_are_unique() {
        let mut manager = SelectionManager::default();
        let colors: Vec<_> = (0..600)
            .map(|i| manager.register_selectable(Marker::named(&i.to_string())).unwrap().1)
            .collect();
        let unique: HashSet<_> = colors.iter().copied().collect();
        assert_eq!(unique.len(), 600);
        assert!(!unique.contains(&PickColor::BACKGROUND));
    }

    #[test]
    fn test_freed_color_is_reused_without_duplicates() {
        let mut manager = SelectionManager::new(&SelectionConfig { color_chunk_size: 2 });
        let (a, color_a) = manager.register_selectable(Marker::named("a")).unwrap();
        let (_, color_b) = manager.register_selectable(Marker::named("b")).unwrap();

        assert_eq!(manager.remove_selectable(a), PickColor::BACKGROUND);
        let (c, color_c) = manager.register_selectable(Marker::named("c")).unwrap();
        assert_eq!(color_c, color_a);
        assert_ne!(color_c, color_b);
        assert_eq!(manager.color_of(c), Ok(color_a));
        assert_eq!(manager.color_of(a), Err(SelectionError::UnknownSelectable));
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_select_and_deselect() {
        let mut manager = SelectionManager::default();
        let first = Marker::named("first");
        let second = Marker::named("second");
        let (first_key, first_color) = manager.register_selectable(first.clone()).unwrap();
        let (_, second_color) = manager.register_selectable(second.clone()).unwrap();

        manager.begin_selection_draw(10, 20);
        assert!(manager.is_selection_draw());
        assert_eq!(manager.selection_point(), (10, 20));

        assert!(manager.select_item_with_color(first_color));
        assert!(!manager.is_selection_draw());
        assert!(first.is_selected());
        assert_eq!(manager.selected_item(), Some(first_key));
        assert_eq!(manager.selected_info().unwrap()["name"], "first");

        assert!(manager.select_item_with_color(second_color));
        assert!(!first.is_selected());
        assert!(second.is_selected());

        assert!(!manager.select_item_with_color(PickColor::BACKGROUND));
        assert!(!second.is_selected());
        assert_eq!(manager.selected_item(), None);
        assert!(manager.selected_info().is_none());
    }

    #[test]
    fn test_removing_selected_item_clears_selection() {
        let mut manager = SelectionManager::default();
        let marker = Marker::named("m");
        let (key, color) = manager.register_selectable(marker.clone()).unwrap();
        manager.select_item_with_color(color);
        manager.remove_selectable(key);
        assert!(!marker.is_selected());
        assert_eq!(manager.selected_item(), None);
        assert!(!manager.select_item_with_color(color));
    }

    #[test]
    fn test_pick_color_conversions() {
        let color = PickColor::from_rgba_bytes([2, 1, 1, 255]);
        assert_eq!(color, PickColor::new(2, 1, 1));
        let rgba = color.to_rgba_f32();
        approx::assert_relative_eq!(rgba[0], 2.0 / 255.0);
        approx::assert_relative_eq!(rgba[3], 1.0);
        assert_eq!(color.to_string(), "#020101");
    }
}
