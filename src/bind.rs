use std::num::{NonZeroU32, NonZeroU64};

use itertools::Itertools;
use wgpu::{
    BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType,
    BufferBindingType, Device, SamplerBindingType, ShaderStages, TextureSampleType,
    TextureViewDimension,
};

#[derive(Clone, Copy, Debug)]
pub enum BindEntryType {
    BufferUniform {
        size: u64,
    },
    Texture {
        sample_type: TextureSampleType,
        view_dimension: TextureViewDimension,
    },
    Sampler(SamplerBindingType),
}

#[derive(Clone, Copy, Debug)]
pub struct BindEntry {
    pub visibility: ShaderStages,
    pub ty: BindEntryType,
    pub count: Option<NonZeroU32>,
}

impl BindEntry {
    pub fn layout_entry(&self, binding: u32) -> BindGroupLayoutEntry {
        BindGroupLayoutEntry {
            binding,
            visibility: self.visibility,
            ty: match self.ty {
                BindEntryType::BufferUniform { size } => BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(size),
                },
                BindEntryType::Texture {
                    sample_type,
                    view_dimension,
                } => BindingType::Texture {
                    sample_type,
                    view_dimension,
                    multisampled: false,
                },
                BindEntryType::Sampler(binding_type) => BindingType::Sampler(binding_type),
            },
            count: self.count,
        }
    }
}

/// Entries are bound in order, starting at binding 0.
pub fn build_layout(device: &Device, label: &str, entries: &[BindEntry]) -> BindGroupLayout {
    let layout_entries = entries
        .iter()
        .enumerate()
        .map(|(binding, entry)| entry.layout_entry(binding as u32))
        .collect_vec();
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &layout_entries,
    })
}

/// Group 0 of the text shader: the colour uniform.
pub fn color_entries() -> [BindEntry; 1] {
    [BindEntry {
        visibility: ShaderStages::FRAGMENT,
        ty: BindEntryType::BufferUniform {
            size: std::mem::size_of::<[f32; 4]>() as u64,
        },
        count: None,
    }]
}

/// Group 1 of the text shader: the glyph texture and its sampler.
pub fn glyph_entries() -> [BindEntry; 2] {
    [
        BindEntry {
            visibility: ShaderStages::FRAGMENT,
            ty: BindEntryType::Texture {
                sample_type: TextureSampleType::Float { filterable: true },
                view_dimension: TextureViewDimension::D2,
            },
            count: None,
        },
        BindEntry {
            visibility: ShaderStages::FRAGMENT,
            ty: BindEntryType::Sampler(SamplerBindingType::Filtering),
            count: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyph_entries_bind_texture_then_sampler() {
        let entries = glyph_entries();
        let texture = entries[0].layout_entry(0);
        let sampler = entries[1].layout_entry(1);

        assert!(matches!(texture.ty, BindingType::Texture { .. }));
        assert!(matches!(
            sampler.ty,
            BindingType::Sampler(SamplerBindingType::Filtering)
        ));
        assert_eq!(sampler.binding, 1);
    }

    #[test]
    fn test_color_uniform_is_one_vec4() {
        let entry = color_entries()[0].layout_entry(0);
        match entry.ty {
            BindingType::Buffer {
                min_binding_size, ..
            } => assert_eq!(min_binding_size.map(NonZeroU64::get), Some(16)),
            other => panic!("expected a buffer binding, got {:?}", other),
        }
    }
}
