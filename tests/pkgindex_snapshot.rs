//! Snapshot coverage of the `--index` line format (§6), comparing
//! `pkgindex::generate`'s output against a literal expectation the way
//! `rustfix`'s `parse_and_replace` test compares generated text via
//! `snapbox::Data::text`.

use portwright::core::{Attributes, Field, InstallStatus, Origin, Port, World};
use portwright::pkgindex;
use snapbox::Data;

fn attrs(pkgname: &str, prefix: &str, comment: &str, maintainer: &str, categories: &str) -> Attributes {
    let mut lines = vec![String::new(); Field::ORDER.len()];
    let idx = |f: Field| Field::ORDER.iter().position(|x| *x == f).unwrap();
    lines[idx(Field::Pkgname)] = pkgname.to_string();
    lines[idx(Field::Prefix)] = prefix.to_string();
    lines[idx(Field::Comment)] = comment.to_string();
    lines[idx(Field::Maintainer)] = maintainer.to_string();
    lines[idx(Field::Categories)] = categories.to_string();
    Attributes::from_lines("/usr/ports", &lines)
}

#[test]
fn index_line_matches_the_pipe_delimited_format() {
    let mut world = World::new("/usr/ports");
    let origin = Origin::new("www/tiny");
    world.insert_port(Port::new(
        origin.clone(),
        attrs("tiny-1.0", "/usr/local", "A tiny port", "ports@example.org", "www"),
        InstallStatus::Absent,
    ));
    world.rebuild_depend_handler(&origin, &mut |_| {});

    let output = pkgindex::generate(&world);

    let expected =
        "tiny-1.0|/usr/ports/www/tiny|/usr/local|A tiny port||ports@example.org|www||||||\n";

    snapbox::assert_data_eq!(Data::text(output), Data::text(expected));
}

#[test]
fn index_is_sorted_by_origin_with_one_line_per_port() {
    let mut world = World::new("/usr/ports");
    let b = Origin::new("www/b");
    let a = Origin::new("devel/a");
    world.insert_port(Port::new(
        b.clone(),
        attrs("b-1.0", "/usr/local", "b port", "", "www"),
        InstallStatus::Absent,
    ));
    world.insert_port(Port::new(
        a.clone(),
        attrs("a-1.0", "/usr/local", "a port", "", "devel"),
        InstallStatus::Absent,
    ));
    world.rebuild_depend_handler(&a, &mut |_| {});
    world.rebuild_depend_handler(&b, &mut |_| {});

    let output = pkgindex::generate(&world);
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("a-1.0|"));
    assert!(lines[1].starts_with("b-1.0|"));
}
