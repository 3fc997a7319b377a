//! Descriptor sets used by the test suites of this workspace.
//!
//! Built from `prost-types` structs rather than checked-in `.desc` files so
//! the shape of each schema is visible where it is used.

use prost::Message;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet};

fn field(name: &str, number: i32, kind: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(kind as i32),
        ..FieldDescriptorProto::default()
    }
}

fn message_field(name: &str, number: i32, type_name: &str, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        label: Some(label as i32),
        ..field(name, number, Type::Message)
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..DescriptorProto::default()
    }
}

fn file(name: &str, package: &str, dependencies: &[&str], messages: Vec<DescriptorProto>) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: Some(package.to_string()),
        dependency: dependencies.iter().map(|d| d.to_string()).collect(),
        message_type: messages,
        syntax: Some("proto3".to_string()),
        ..FileDescriptorProto::default()
    }
}

/// `contract.proto`: `message Person { string name = 1; int32 id = 2; string email = 3; }`
pub fn person_schema_set() -> Vec<u8> {
    FileDescriptorSet {
        file: vec![file(
            "contract.proto",
            "contract",
            &[],
            vec![message(
                "Person",
                vec![
                    field("name", 1, Type::String),
                    field("id", 2, Type::Int32),
                    field("email", 3, Type::String),
                ],
            )],
        )],
    }
    .encode_to_vec()
}

/// Two files: `geo.proto` defines `Address`; `book.proto` imports it and
/// defines `AddressBook` with a nested `PhoneNumber`.
pub fn address_book_schema_set() -> Vec<u8> {
    let geo = file(
        "geo.proto",
        "geo",
        &[],
        vec![message(
            "Address",
            vec![
                field("street", 1, Type::String),
                field("city", 2, Type::String),
            ],
        )],
    );

    let mut book = message(
        "AddressBook",
        vec![
            field("owner", 1, Type::String),
            message_field("home", 2, ".geo.Address", Label::Optional),
            message_field(
                "phones",
                3,
                ".book.AddressBook.PhoneNumber",
                Label::Repeated,
            ),
            field("active", 4, Type::Bool),
        ],
    );
    book.nested_type.push(message(
        "PhoneNumber",
        vec![field("number", 1, Type::String)],
    ));

    FileDescriptorSet {
        file: vec![geo, file("book.proto", "book", &["geo.proto"], vec![book])],
    }
    .encode_to_vec()
}

/// `Broken` references a message type no file defines.
pub fn unlinkable_schema_set() -> Vec<u8> {
    FileDescriptorSet {
        file: vec![file(
            "broken.proto",
            "broken",
            &[],
            vec![message(
                "Broken",
                vec![message_field("ghost", 1, ".broken.Missing", Label::Optional)],
            )],
        )],
    }
    .encode_to_vec()
}
