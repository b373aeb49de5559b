//! # Photomark
//!
//! A text watermarking engine for photographs. Given a decoded image and a
//! [`WatermarkSpec`](imaging::WatermarkSpec), it measures the text, decides
//! where it goes, draws it on a transparent overlay and blends that overlay
//! onto a copy of the image.
//!
//! # Architecture: One Rendering Path
//!
//! Previews and exports go through the same call:
//!
//! ```text
//! spec ──► FontChain ──► measure ──► resolve_position ──► draw ──► over-blend
//!                                                                   │
//!                     render_preview ◄── resize_to_fit ◄────────────┤
//!                     watermark_file ──► encode ──► atomic write ◄──┘
//! ```
//!
//! A preview is the export scaled down, so what the user positions is what
//! gets written. Every step is a pure function of its inputs; the engine keeps
//! no memory between calls.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Placement, fonts, text, compositing, codecs, preview/export operations |
//! | [`template`] | JSON watermark templates ↔ `WatermarkSpec` (opacity, position modes) |
//! | [`config`] | `photomark.toml` loading, validation and merging |
//!
//! # Design Decisions
//!
//! ## Placement as a Sum Type
//!
//! A watermark is placed by a named anchor, by fractions of the free space, or
//! by exact pixels. [`Placement`](imaging::Placement) is an enum with one
//! variant per mode, and the resolver matches it exhaustively. The margin is
//! 10px; bottom anchors sit another 20px higher, a fixed visual offset kept
//! as [`BOTTOM_BIAS`](imaging::BOTTOM_BIAS).
//!
//! ## Fonts Never Fail
//!
//! Fonts come from an ordered [`FontChain`](imaging::FontChain) of providers:
//! the caller's file, CJK system fonts, a Western font, then a built-in bitmap
//! font. CJK faces come first because Western fonts silently drop CJK glyphs.
//! A missing font is a logged substitution, never an error.
//!
//! ## Ink Boxes, Not Metrics
//!
//! Placement uses the tight box around the drawn pixels, measured with the
//! same rasterizer that draws them. Dragging a watermark to the corner of a
//! preview puts the visible text there, not its line box.
//!
//! ## JPEG Has No Alpha
//!
//! Images with transparency are flattened onto white before JPEG encoding.
//! Writes go to `<name>.partial` and are renamed into place, so a failed
//! export never leaves a truncated file behind.

pub mod config;
pub mod imaging;
pub mod template;

#[cfg(test)]
pub(crate) mod test_helpers;
