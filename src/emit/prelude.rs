// src/emit/prelude.rs

//! The loader prelude embedded at the top of every bundle.
//!
//! A minimal lazy registry: a module's exports object is registered *before*
//! its body runs, so a circular `require` chain observes the
//! partially-initialized exports of the module that is still evaluating
//! instead of re-entering it or deadlocking. Evaluation is memoized on first
//! access.

pub const LOADER_PRELUDE: &str = r#"(function (modules, entries) {
  var registry = {};
  function load(id) {
    var record = registry[id];
    if (record) {
      return record.exports;
    }
    record = registry[id] = { exports: {} };
    var definition = modules[id];
    function localRequire(specifier) {
      return load(definition[1][specifier]);
    }
    definition[0].call(record.exports, localRequire, record, record.exports);
    return record.exports;
  }
  for (var i = 0; i < entries.length; i++) {
    load(entries[i]);
  }
  return load;
})"#;
