//! # Websmith
//!
//! A static site builder for a personal website. The input tree is the data
//! source: markdown files become pages, `*.blog` files become a
//! chronologically linked blog, and outline scripts under `cyoa/` become
//! choose-your-own-adventure games. All typesetting is delegated to pandoc;
//! websmith's job is to assemble the right documents, in the right places,
//! with the right cross-links.
//!
//! # Architecture: Batch Pipeline
//!
//! A build is one synchronous batch:
//!
//! ```text
//! 1. Read      input/   →  documents      (parse, sort, link, fingerprint)
//! 2. Check     documents                  (duplicate-target pre-check)
//! 3. Emit      documents →  www/          (pandoc render, write, gzip)
//! ```
//!
//! Nothing is written until the whole batch passes the conflict check, so a
//! fatal error never leaves a half-updated site. Rebuilds are idempotent:
//! unchanged inputs reproduce the same ids, slugs, and bytes.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`outline`] | Parser for the marker-indented record format of game scripts |
//! | [`adventure`] | Game graph: name resolution, unique ids, location documents |
//! | [`blog`] | Post parsing, chronological ordering, slugs, year indexes |
//! | [`document`] | Output-document records: target validation, conflict check, gzip |
//! | [`render`] | The pandoc seam — a trait so tests can typeset without pandoc |
//! | [`layout`] | Input/output tree layout and target-path helpers |
//! | [`site`] | Pipeline driver: walk, assemble, check, render, write |
//! | [`config`] | `config.toml` loading and the documented stock config |
//!
//! # Design Decisions
//!
//! ## Content-Derived Ids for Game Locations
//!
//! Adventure pages are published under a 16-hex-char fingerprint of their
//! content rather than their name. Renaming or renumbering locations never
//! breaks deployed URLs for unchanged pages, players can't guess page URLs
//! from location names, and ids stay stable across rebuilds. Collisions are
//! resolved deterministically by folding a retry counter into the hash.
//!
//! ## Stable Ordering Over Clever Ordering
//!
//! The blog relies on one guarantee: posts sorted ascending by date, with
//! same-date posts keeping their source-file order. That comes straight from
//! the standard library's stable sort — no tie-breaking keys, no sequence
//! numbers in post headers.
//!
//! ## Pandoc Behind a Trait
//!
//! Markdown conversion, LaTeX equations, and templating belong to pandoc.
//! The [`render::Render`] trait keeps that boundary explicit and lets the
//! whole pipeline run in tests with a fake renderer.

pub mod adventure;
pub mod blog;
pub mod config;
pub mod document;
pub mod layout;
pub mod outline;
pub mod render;
pub mod site;
