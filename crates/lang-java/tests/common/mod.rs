#![allow(dead_code)]

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Constant pool under construction. Utf8 entries are shared.
#[derive(Default)]
struct Pool {
    bytes: Vec<u8>,
    next: u16,
    utf8: HashMap<String, u16>,
}

impl Pool {
    fn new() -> Self {
        Self {
            next: 1,
            ..Self::default()
        }
    }

    fn utf8(&mut self, value: &str) -> u16 {
        if let Some(index) = self.utf8.get(value) {
            return *index;
        }
        let index = self.raw_utf8(value.as_bytes());
        self.utf8.insert(value.to_string(), index);
        index
    }

    fn raw_utf8(&mut self, bytes: &[u8]) -> u16 {
        self.bytes.push(1);
        u2(&mut self.bytes, bytes.len() as u16);
        self.bytes.extend_from_slice(bytes);
        self.take(1)
    }

    fn class(&mut self, internal: &str) -> u16 {
        let name = self.utf8(internal);
        self.bytes.push(7);
        u2(&mut self.bytes, name);
        self.take(1)
    }

    fn long(&mut self, value: i64) -> u16 {
        self.bytes.push(5);
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self.take(2)
    }

    fn take(&mut self, slots: u16) -> u16 {
        let index = self.next;
        self.next += slots;
        index
    }
}

fn u2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn u4(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn internal(name: &str) -> String {
    name.replace('.', "/")
}

/// Assembles class files the way javac lays them out: a long constant and a
/// modified UTF-8 literal in the pool, a field, a constructor with a `Code`
/// attribute and a method-level annotation, then class attributes.
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    name: String,
    super_class: Option<String>,
    interfaces: Vec<String>,
    visible: Vec<String>,
    invisible: Vec<String>,
    major: u16,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            super_class: Some("java.lang.Object".to_string()),
            interfaces: Vec::new(),
            visible: Vec::new(),
            invisible: Vec::new(),
            major: 61,
        }
    }

    /// `java.lang.Object` itself.
    pub fn root() -> Self {
        Self {
            super_class: None,
            ..Self::new("java.lang.Object")
        }
    }

    pub fn extends(mut self, name: &str) -> Self {
        self.super_class = Some(name.to_string());
        self
    }

    pub fn implements(mut self, name: &str) -> Self {
        self.interfaces.push(name.to_string());
        self
    }

    pub fn annotated(mut self, name: &str) -> Self {
        self.visible.push(name.to_string());
        self
    }

    pub fn annotated_invisible(mut self, name: &str) -> Self {
        self.invisible.push(name.to_string());
        self
    }

    pub fn version(mut self, major: u16) -> Self {
        self.major = major;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource_path(&self) -> String {
        format!("{}.class", internal(&self.name))
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = Pool::new();
        pool.long(0x0102_0304_0506_0708);
        // Encoded surrogate half, valid modified UTF-8 but not UTF-8.
        let literal = pool.raw_utf8(&[0xED, 0xA0, 0xBD]);
        let this_class = pool.class(&internal(&self.name));
        let super_class = self
            .super_class
            .as_deref()
            .map(|s| pool.class(&internal(s)))
            .unwrap_or(0);
        let interfaces: Vec<u16> = self
            .interfaces
            .iter()
            .map(|i| pool.class(&internal(i)))
            .collect();

        let mut members = Vec::new();
        // fields
        u2(&mut members, 1);
        u2(&mut members, 0x0019);
        u2(&mut members, pool.utf8("ID"));
        u2(&mut members, pool.utf8("J"));
        u2(&mut members, 1);
        u2(&mut members, pool.utf8("ConstantValue"));
        u4(&mut members, 2);
        u2(&mut members, 1);
        // methods
        u2(&mut members, 1);
        u2(&mut members, 0x0001);
        u2(&mut members, pool.utf8("<init>"));
        u2(&mut members, pool.utf8("()V"));
        u2(&mut members, 2);
        u2(&mut members, pool.utf8("Code"));
        let code = [0u8, 1, 0, 1, 0, 0, 0, 5, 0x2a, 0xb7, 0x00, 0x01, 0xb1, 0, 0, 0, 0];
        u4(&mut members, code.len() as u32);
        members.extend_from_slice(&code);
        let method_annotations = annotations(&mut pool, &["method.Only".to_string()], literal);
        u2(&mut members, pool.utf8("RuntimeVisibleAnnotations"));
        u4(&mut members, method_annotations.len() as u32);
        members.extend_from_slice(&method_annotations);

        let mut attributes: Vec<(u16, Vec<u8>)> = Vec::new();
        let source_file = pool.utf8("Source.java");
        attributes.push((pool.utf8("SourceFile"), source_file.to_be_bytes().to_vec()));
        if !self.visible.is_empty() {
            let body = annotations(&mut pool, &self.visible, literal);
            attributes.push((pool.utf8("RuntimeVisibleAnnotations"), body));
        }
        if !self.invisible.is_empty() {
            let body = annotations(&mut pool, &self.invisible, literal);
            attributes.push((pool.utf8("RuntimeInvisibleAnnotations"), body));
        }

        let mut out = Vec::new();
        u4(&mut out, 0xCAFEBABE);
        u2(&mut out, 0);
        u2(&mut out, self.major);
        u2(&mut out, pool.next);
        out.extend_from_slice(&pool.bytes);
        u2(&mut out, 0x0021);
        u2(&mut out, this_class);
        u2(&mut out, super_class);
        u2(&mut out, interfaces.len() as u16);
        for index in interfaces {
            u2(&mut out, index);
        }
        out.extend_from_slice(&members);
        u2(&mut out, attributes.len() as u16);
        for (name, body) in attributes {
            u2(&mut out, name);
            u4(&mut out, body.len() as u32);
            out.extend_from_slice(&body);
        }
        out
    }
}

/// An annotations attribute body whose elements exercise every value kind.
fn annotations(pool: &mut Pool, types: &[String], literal: u16) -> Vec<u8> {
    let mut out = Vec::new();
    u2(&mut out, types.len() as u16);
    for name in types {
        u2(&mut out, pool.utf8(&format!("L{};", internal(name))));
        let value = pool.utf8("value");
        u2(&mut out, 5);
        // value = "..."
        u2(&mut out, value);
        out.push(b's');
        u2(&mut out, literal);
        // value = SomeEnum.A
        u2(&mut out, value);
        out.push(b'e');
        u2(&mut out, pool.utf8("Lx/Kind;"));
        u2(&mut out, pool.utf8("A"));
        // value = Foo.class
        u2(&mut out, value);
        out.push(b'c');
        u2(&mut out, pool.utf8("Lx/Foo;"));
        // value = @Nested(flag = true)
        u2(&mut out, value);
        out.push(b'@');
        u2(&mut out, pool.utf8("Lx/Nested;"));
        u2(&mut out, 1);
        u2(&mut out, pool.utf8("flag"));
        out.push(b'Z');
        u2(&mut out, 1);
        // value = {1, 2L}
        u2(&mut out, value);
        out.push(b'[');
        u2(&mut out, 2);
        out.push(b'I');
        u2(&mut out, 1);
        out.push(b'J');
        u2(&mut out, 1);
    }
    out
}

/// Write each class under `root` at its package path.
pub fn write_classes(root: &Path, classes: &[ClassBuilder]) {
    for class in classes {
        let path = root.join(class.resource_path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, class.build()).unwrap();
    }
}

pub fn write_file(root: &Path, relative: &str, bytes: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

/// Build a jar with the given classes and extra raw entries. A manifest
/// with `Class-Path` is written when `class_path` is given.
pub fn write_jar(
    path: &Path,
    classes: &[ClassBuilder],
    extra: &[(&str, &[u8])],
    class_path: Option<&str>,
) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    if let Some(class_path) = class_path {
        writer.add_directory("META-INF/", options).unwrap();
        writer.start_file("META-INF/MANIFEST.MF", options).unwrap();
        let manifest = format!("Manifest-Version: 1.0\r\nClass-Path: {class_path}\r\n\r\n");
        writer.write_all(manifest.as_bytes()).unwrap();
    }
    for class in classes {
        writer.start_file(class.resource_path(), options).unwrap();
        writer.write_all(&class.build()).unwrap();
    }
    for (name, bytes) in extra {
        writer.start_file(*name, options).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap();
}
