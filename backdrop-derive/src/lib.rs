//! Derive macros for the backdrop particle engine.
//!
//! This crate provides one derive macro:
//!
//! - [`ShaderUniforms`] - Generates a GPU-compatible uniform block and its WGSL declaration
//!
//! # Usage
//!
//! The macro is re-exported from the main `backdrop` crate:
//!
//! ```ignore
//! use backdrop::prelude::*;
//!
//! #[derive(ShaderUniforms, Clone, Copy)]
//! struct Wind {
//!     direction: Vec3,
//!     strength: f32,
//!     gusty: bool,
//! }
//! ```
//!
//! # Generated Items
//!
//! - A companion `{Name}Gpu` struct, `#[repr(C)]`, `Pod`, with explicit padding
//! - A `WGSL_STRUCT` constant with a matching `struct {Name} { ... }` declaration
//! - `to_gpu()` for converting the Rust value into its uniform-buffer form
//! - `FIELD_OFFSETS`, the byte offset of every declared field
//!
//! ## Uniform Address Space Layout
//!
//! Uniform buffers are stricter than storage buffers:
//! - `vec3<f32>` is 16-byte aligned but only 12 bytes wide, so a scalar may
//!   follow it in the same 16-byte slot
//! - `array<f32, N>` is not allowed for padding (uniform arrays need a 16-byte
//!   stride), so every padding word is emitted as its own `f32` member
//! - The struct size is rounded up to a multiple of 16
//!
//! `bool` is not host-shareable in WGSL; it is stored as `u32` (0 or 1).

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Ident, Type};

/// Derive a uniform block layout for a struct of scalars and glam vectors.
///
/// Supported field types: `f32`, `u32`, `i32`, `bool`, `Vec2`, `Vec3`, `Vec4`.
#[proc_macro_derive(ShaderUniforms)]
pub fn derive_shader_uniforms(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let name_str = name.to_string();
    let gpu_name = Ident::new(&format!("{}Gpu", name), Span::call_site());

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => panic!("ShaderUniforms derive only supports structs with named fields"),
        },
        _ => panic!("ShaderUniforms derive only supports structs"),
    };

    let mut layout = Layout::default();

    for field in fields.iter() {
        let field_name = field
            .ident
            .as_ref()
            .expect("named fields always carry an identifier");
        let info = rust_type_info(&field.ty);

        layout.pad_to(info.align);
        layout.offsets.push((field_name.to_string(), layout.offset));
        layout
            .wgsl_fields
            .push(format!("    {}: {},", field_name, info.wgsl_type));

        let gpu_type = info.gpu_type;
        layout.gpu_fields.push(quote! { #field_name: #gpu_type });

        let conversion = generate_conversion(field_name, info.kind);
        layout.conversions.push(quote! { #field_name: #conversion });

        layout.offset += info.size;
    }

    // Uniform blocks are sized in whole 16-byte slots.
    layout.pad_to(16);

    let wgsl_struct = format!("struct {} {{\n{}\n}}", name_str, layout.wgsl_fields.join("\n"));
    let size = layout.offset;
    let gpu_fields = &layout.gpu_fields;
    let conversions = &layout.conversions;
    let offset_names: Vec<&String> = layout.offsets.iter().map(|(n, _)| n).collect();
    let offset_values: Vec<u32> = layout.offsets.iter().map(|(_, o)| *o).collect();

    let expanded = quote! {
        #[repr(C)]
        #[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
        pub struct #gpu_name {
            #(pub #gpu_fields),*
        }

        impl backdrop::ShaderUniforms for #name {
            type Gpu = #gpu_name;

            const WGSL_NAME: &'static str = #name_str;
            const WGSL_STRUCT: &'static str = #wgsl_struct;
            const SIZE: u32 = #size;
            const FIELD_OFFSETS: &'static [(&'static str, u32)] = &[
                #((#offset_names, #offset_values)),*
            ];

            fn to_gpu(&self) -> Self::Gpu {
                #gpu_name {
                    #(#conversions),*
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// Running state while laying out a uniform block.
#[derive(Default)]
struct Layout {
    offset: u32,
    pad_count: u32,
    wgsl_fields: Vec<String>,
    gpu_fields: Vec<proc_macro2::TokenStream>,
    conversions: Vec<proc_macro2::TokenStream>,
    offsets: Vec<(String, u32)>,
}

impl Layout {
    /// Insert `f32` padding words until `offset` is a multiple of `align`.
    fn pad_to(&mut self, align: u32) {
        let padding = (align - (self.offset % align)) % align;
        for _ in 0..padding / 4 {
            let pad_name = Ident::new(&format!("_pad{}", self.pad_count), Span::call_site());
            self.wgsl_fields.push(format!("    _pad{}: f32,", self.pad_count));
            self.gpu_fields.push(quote! { #pad_name: f32 });
            self.conversions.push(quote! { #pad_name: 0.0 });
            self.pad_count += 1;
        }
        self.offset += padding;
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    Scalar,
    Bool,
    Vector,
}

/// Type metadata for uniform layout calculations.
struct TypeInfo {
    wgsl_type: &'static str,
    gpu_type: proc_macro2::TokenStream,
    kind: Kind,
    size: u32,
    align: u32,
}

fn rust_type_info(ty: &Type) -> TypeInfo {
    let type_str = quote!(#ty).to_string().replace(' ', "");

    match type_str.as_str() {
        "Vec3" | "glam::Vec3" => TypeInfo {
            wgsl_type: "vec3<f32>",
            gpu_type: quote! { [f32; 3] },
            kind: Kind::Vector,
            size: 12,
            align: 16,
        },
        "Vec2" | "glam::Vec2" => TypeInfo {
            wgsl_type: "vec2<f32>",
            gpu_type: quote! { [f32; 2] },
            kind: Kind::Vector,
            size: 8,
            align: 8,
        },
        "Vec4" | "glam::Vec4" => TypeInfo {
            wgsl_type: "vec4<f32>",
            gpu_type: quote! { [f32; 4] },
            kind: Kind::Vector,
            size: 16,
            align: 16,
        },
        "f32" => TypeInfo {
            wgsl_type: "f32",
            gpu_type: quote! { f32 },
            kind: Kind::Scalar,
            size: 4,
            align: 4,
        },
        "u32" => TypeInfo {
            wgsl_type: "u32",
            gpu_type: quote! { u32 },
            kind: Kind::Scalar,
            size: 4,
            align: 4,
        },
        "i32" => TypeInfo {
            wgsl_type: "i32",
            gpu_type: quote! { i32 },
            kind: Kind::Scalar,
            size: 4,
            align: 4,
        },
        "bool" => TypeInfo {
            wgsl_type: "u32",
            gpu_type: quote! { u32 },
            kind: Kind::Bool,
            size: 4,
            align: 4,
        },
        _ => panic!("Unsupported type in ShaderUniforms struct: {}", type_str),
    }
}

fn generate_conversion(field_name: &Ident, kind: Kind) -> proc_macro2::TokenStream {
    match kind {
        Kind::Vector => quote! { self.#field_name.to_array() },
        Kind::Bool => quote! { self.#field_name as u32 },
        Kind::Scalar => quote! { self.#field_name },
    }
}
