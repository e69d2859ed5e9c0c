use mql_engine::program::builder::ProgramBuilder;
use mql_engine::program::labels::Labels;
use mql_engine::program::Assertion;
use mql_engine::Primitive;
use pretty_assertions::assert_eq;

#[test]
fn test_field_index_and_comparison_label() {
    let mut b = ProgramBuilder::new();
    let sshd = b.call("sshd.config", None, vec![]);
    let params = b.call("params", Some(sshd), vec![]);
    let port = b.call("[]", Some(params), vec![Primitive::string("Port")]);
    let eq = b.call("==", Some(port), vec![Primitive::string("22")]);
    b.entrypoint(eq);
    b.datapoint(params);
    let program = b.build();

    let labels = Labels::for_program(&program).unwrap();
    assert_eq!(
        labels.get(program.checksum(eq).unwrap()),
        Some(r#"sshd.config.params[Port] == "22""#)
    );
    assert_eq!(
        labels.get(program.checksum(params).unwrap()),
        Some("sshd.config.params")
    );
}

#[test]
fn test_ref_operands_and_properties() {
    let mut b = ProgramBuilder::new();
    let file = b.call("file", None, vec![Primitive::string("path"), Primitive::string("/etc/hosts")]);
    let size = b.call("size", Some(file), vec![]);
    let limit = b.property("maxSize");
    let lt = b.call("<", Some(size), vec![Primitive::reference(limit)]);
    let idx = b.call("[]", Some(size), vec![Primitive::int(-1)]);
    let lit = b.primitive(Primitive::int(7));
    b.entrypoint(lt);
    b.datapoint(idx);
    b.datapoint(lit);
    let program = b.build();

    let labels = Labels::for_program(&program).unwrap();
    assert_eq!(labels.get(program.checksum(lt).unwrap()), Some("file.size < maxSize"));
    assert_eq!(labels.get(program.checksum(idx).unwrap()), Some("file.size[-1]"));
    assert_eq!(labels.get(program.checksum(lit).unwrap()), Some(""));
}

#[test]
fn test_accented_names_keep_their_base_letters() {
    let mut b = ProgramBuilder::new();
    let limit = b.property("gr\u{f6}\u{df}e");
    let user = b.call("utilisateur", None, vec![]);
    let name = b.call("pr\u{e9}nom", Some(user), vec![]);
    b.datapoint(limit);
    b.datapoint(name);
    let program = b.build();

    let labels = Labels::for_program(&program).unwrap();
    // no compatibility decomposition exists for the sharp s
    assert_eq!(labels.get(program.checksum(limit).unwrap()), Some("groe"));
    assert_eq!(labels.get(program.checksum(name).unwrap()), Some("utilisateur.prenom"));
}

#[test]
fn test_assertion_datapoints_are_not_labeled() {
    let mut b = ProgramBuilder::new();
    let users = b.call("users", None, vec![]);
    let list = b.call("list", Some(users), vec![]);
    let inner = b.call("length", Some(list), vec![]);
    let eq = b.call("==", Some(inner), vec![Primitive::int(0)]);
    b.entrypoint(eq);
    b.datapoint(inner);
    b.assertion(
        eq,
        Assertion {
            datapoints: vec![inner],
            ..Default::default()
        },
    );
    let program = b.build();

    let labels = Labels::for_program(&program).unwrap();
    assert_eq!(
        labels.get(program.checksum(eq).unwrap()),
        Some("users.list.length == 0")
    );
    assert_eq!(labels.get(program.checksum(inner).unwrap()), None);
    assert_eq!(labels.labels.len(), 1);
}

#[test]
fn test_decode_block_assertions_drop_their_checksums() {
    let mut b = ProgramBuilder::new();
    let users = b.call("users", None, vec![]);
    let list = b.call("list", Some(users), vec![]);
    b.entrypoint(list);
    b.entrypoint(users);
    let mut program = b.build();

    let hidden = program.checksum(list).unwrap().to_string();
    program.assertions.insert(
        list,
        Assertion {
            checksums: vec![hidden.clone()],
            decode_block: true,
            ..Default::default()
        },
    );

    let labels = Labels::for_program(&program).unwrap();
    assert_eq!(labels.get(&hidden), None);
    assert_eq!(labels.get(program.checksum(users).unwrap()), Some("users"));
}

#[test]
fn test_block_labels_are_collected_from_functions() {
    let mut block = ProgramBuilder::block();
    let name = block.call("name", Some(1), vec![]);
    block.entrypoint(name);
    let block = block.build();
    let inner = block.checksum(name).unwrap().to_string();

    let mut b = ProgramBuilder::new();
    let users = b.call("users", None, vec![]);
    let list = b.call("list", Some(users), vec![]);
    let f = b.function(block);
    let each = b.call("{}", Some(list), vec![f]);
    b.entrypoint(each);
    let program = b.build();

    let labels = Labels::for_program(&program).unwrap();
    assert_eq!(labels.get(program.checksum(each).unwrap()), Some("users.list"));
    assert_eq!(labels.get(&inner), Some("name"));
}

#[test]
fn test_index_without_argument_fails() {
    let mut b = ProgramBuilder::new();
    let users = b.call("users", None, vec![]);
    let idx = b.call("[]", Some(users), vec![]);
    b.entrypoint(idx);
    let program = b.build();

    assert!(Labels::for_program(&program).is_err());
}
