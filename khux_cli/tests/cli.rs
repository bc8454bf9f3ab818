use assert_cmd::prelude::*;
use byteorder::{WriteBytesExt, LE};
use indoc::{formatdoc, indoc};
use khux::Mode;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn encrypt(data: &[u8], seed: u32, mode: Mode) -> Vec<u8> {
    let mut data = data.to_vec();
    khux::cipher::decrypt_in_place(&mut data, seed, mode);
    data
}

fn entry(name: &str, payload: &[u8], compress: bool) -> Vec<u8> {
    let mut name = name.as_bytes().to_vec();
    name.resize((name.len() + 4) & !3, 0);
    let data = match compress {
        true => zlib(payload),
        false => payload.to_vec(),
    };

    let mut out = b"BGAD".to_vec();
    out.write_u16::<LE>(Mode::Word as u16).unwrap();
    out.write_u16::<LE>(0).unwrap();
    out.write_u16::<LE>(24).unwrap();
    out.write_u16::<LE>(name.len() as u16).unwrap();
    out.write_u16::<LE>(0).unwrap();
    out.write_u16::<LE>(compress as u16).unwrap();
    out.write_u32::<LE>(data.len() as u32).unwrap();
    out.write_u32::<LE>(payload.len() as u32).unwrap();
    out.extend(encrypt(&name, data.len() as u32, Mode::Word));
    out.extend(encrypt(&data, name.len() as u32, Mode::Word));
    out
}

const PIXELS: [u8; 8] = [0xFF, 0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0x80];

/// 2x1 direct color texture placed at 1,1 on a 3x2 canvas.
fn texture() -> Vec<u8> {
    let compressed = zlib(&PIXELS);
    let mut out = b"\x89BTF".to_vec();
    out.write_u16::<LE>(0).unwrap();
    out.write_u32::<LE>(0).unwrap();
    out.write_u32::<LE>(0).unwrap();
    out.write_u32::<LE>(0x080000).unwrap();
    out.write_u32::<LE>(0).unwrap();
    for v in [3, 2, 1, 1, 2, 1] {
        out.write_u16::<LE>(v).unwrap();
    }
    out.write_u32::<LE>(compressed.len() as u32).unwrap();
    out.extend(compressed);
    out
}

struct Fixture {
    dir: tempfile::TempDir,
    container: PathBuf,
    texture: PathBuf,
    second_offset: usize,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();

    let first = entry("data/readme.txt", b"Lorem ipsum dolor sit amet", false);
    let second = entry("/", &[0u8; 300], true);
    let container = dir.path().join("assets.mp4");
    std::fs::write(&container, [first.clone(), second].concat()).unwrap();

    let texture_path = dir.path().join("icon.PNG");
    std::fs::write(&texture_path, texture()).unwrap();

    Fixture {
        container,
        texture: texture_path,
        second_offset: first.len(),
        dir,
    }
}

fn khux() -> Command {
    Command::cargo_bin("khux").unwrap()
}

fn read_png(path: &Path) -> (u32, u32, Vec<u8>) {
    let image = image::open(path).unwrap().to_rgba8();
    (image.width(), image.height(), image.into_raw())
}

#[test]
fn test_cli_info() {
    let fixture = fixture();

    let assert = khux().arg("info").arg(&fixture.container).assert();
    assert.success().stdout(indoc! {"
        type: BGAD
        2 entries
    "});

    let assert = khux().arg("info").arg(&fixture.texture).assert();
    assert.success().stdout(formatdoc! {"
        type: BTF
        format: Direct
        size: 2x1
        canvas: 3x2 at 1,1
        palette size: 0
        compressed size: {}
    ", zlib(&PIXELS).len()});
}

#[test]
fn test_cli_list() {
    let fixture = fixture();

    let assert = khux().arg("list").arg(&fixture.container).assert();
    assert.success().stdout(formatdoc! {"
        0x00000000 data/readme.txt
        {:#010x} /
    ", fixture.second_offset});
}

#[test]
fn test_cli_list_strict() {
    let fixture = fixture();
    let mut bytes = std::fs::read(&fixture.container).unwrap();
    bytes.extend_from_slice(b"garbage that is not an entry");
    std::fs::write(&fixture.container, bytes).unwrap();

    khux()
        .arg("list")
        .arg(&fixture.container)
        .assert()
        .success();
    khux()
        .arg("list")
        .arg("--strict")
        .arg(&fixture.container)
        .assert()
        .failure()
        .stderr(indoc! {r#"
            Error: found magic of [67, 61, 72, 62] instead of [42, 47, 41, 44]
        "#});
}

#[test]
fn test_cli_unpack_container() {
    let fixture = fixture();
    let out = fixture.dir.path().join("out");

    let assert = khux()
        .arg("unpack")
        .arg(&fixture.container)
        .arg("-o")
        .arg(&out)
        .assert();
    assert.success().stdout(formatdoc! {"
        Unpacked 2 files to {}
    ", out.display()});

    let root = out.join("bgad").join("assets.mp4");
    assert_eq!(
        std::fs::read(root.join("data").join("readme.txt")).unwrap(),
        b"Lorem ipsum dolor sit amet"
    );
    assert_eq!(std::fs::read(root.join("@root")).unwrap(), vec![0; 300]);
}

#[test]
fn test_cli_unpack_texture() {
    let fixture = fixture();
    let out = fixture.dir.path().join("out");

    khux()
        .arg("unpack")
        .arg(&fixture.texture)
        .arg("-o")
        .arg(&out)
        .arg("--canvas")
        .assert()
        .success();

    assert_eq!(read_png(&out.join("icon.PNG.png")), (2, 1, PIXELS.to_vec()));

    let (width, height, pixels) = read_png(&out.join("icon.PNG_canvas.png"));
    assert_eq!((width, height), (3, 2));
    let mut expected = vec![0; 3 * 2 * 4];
    expected[16..24].copy_from_slice(&PIXELS);
    assert_eq!(pixels, expected);
}

#[test]
fn test_cli_unpack_many() {
    let fixture = fixture();
    let out = fixture.dir.path().join("out");

    let assert = khux()
        .arg("unpack")
        .arg(&fixture.container)
        .arg(&fixture.texture)
        .arg("-o")
        .arg(&out)
        .assert();
    assert.success().stdout(formatdoc! {"
        Unpacked 3 files to {}
    ", out.display()});
    assert!(out.join("icon.PNG.png").is_file());
    assert!(out.join("bgad").join("assets.mp4").join("@root").is_file());
}

#[test]
fn test_cli_unpack_refuses_escaping_names() {
    let fixture = fixture();
    let out = fixture.dir.path().join("out");

    for name in ["x/..", "../escape.bin"] {
        let path = fixture.dir.path().join("evil.mp4");
        std::fs::write(&path, entry(name, b"data", false)).unwrap();

        khux()
            .arg("unpack")
            .arg(&path)
            .arg("-o")
            .arg(&out)
            .assert()
            .failure()
            .stderr(formatdoc! {r#"
                Error: Attempted to write to "{name}" which outside of output directory
            "#});
    }
    assert!(!out.join("bgad").join("evil.mp4").is_file());
    assert!(!out.join("bgad").join("escape.bin").exists());
}

#[test]
fn test_cli_unknown_magic() {
    let fixture = fixture();
    let path = fixture.dir.path().join("sound.ogg");
    std::fs::write(&path, b"OggS and the rest").unwrap();

    khux()
        .arg("unpack")
        .arg(&path)
        .arg("-o")
        .arg(fixture.dir.path().join("out"))
        .assert()
        .failure()
        .stderr(indoc! {"
            Error: unknown file magic [4f, 67, 67, 53]
        "});
}

#[test]
fn test_cli_lwf_unsupported() {
    let fixture = fixture();
    let path = fixture.dir.path().join("anim.lwf");
    std::fs::write(&path, b"LWF\0\x01\x02").unwrap();

    khux()
        .arg("unpack")
        .arg(&path)
        .arg("-o")
        .arg(fixture.dir.path().join("out"))
        .assert()
        .failure()
        .stderr(indoc! {"
            Error: LWF files are not supported
        "});
}
