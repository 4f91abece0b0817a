//! Builders for synthetic archives used by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::object::{FileMetaTableBuilder, InMemDicomObject};
use dicom::transfer_syntax::entries::IMPLICIT_VR_LITTLE_ENDIAN;
use dicom_dictionary_std::{tags, uids};
use flate2::{Compression, write::GzEncoder};
use zip::{ZipWriter, write::SimpleFileOptions};

static NEXT_SOP_INSTANCE: AtomicUsize = AtomicUsize::new(1);

/// Attributes of one synthetic CT object.
#[derive(Debug, Clone)]
pub struct CtSlice {
    pub series_uid: Option<String>,
    pub instance_number: Option<i32>,
    pub rows: u16,
    pub columns: u16,
    /// One buffer of `rows * columns` stored values per frame.
    pub frames: Vec<Vec<u16>>,
    pub rescale: Option<(f64, f64)>,
    pub orientation: Option<[f64; 6]>,
    pub body_part: Option<String>,
    pub modality: String,
}

impl Default for CtSlice {
    fn default() -> Self {
        Self {
            series_uid: Some("1.2.826.0.1.3680043.8.498.1".to_owned()),
            instance_number: None,
            rows: 2,
            columns: 2,
            frames: vec![vec![0; 4]],
            rescale: None,
            orientation: Some([1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
            body_part: Some("CHEST".to_owned()),
            modality: "CT".to_owned(),
        }
    }
}

impl CtSlice {
    /// Single-frame slice filled with `value`.
    pub fn filled(instance_number: i32, value: u16) -> Self {
        Self {
            instance_number: Some(instance_number),
            frames: vec![vec![value; 4]],
            ..Self::default()
        }
    }
}

fn put_str(object: &mut InMemDicomObject, tag: Tag, vr: VR, value: &str) {
    object.put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
}

fn put_decimals(object: &mut InMemDicomObject, tag: Tag, values: &[f64]) {
    let strings = values.iter().map(|v| v.to_string()).collect();
    object.put(DataElement::new(tag, VR::DS, PrimitiveValue::Strs(strings)));
}

fn put_u16(object: &mut InMemDicomObject, tag: Tag, value: u16) {
    object.put(DataElement::new(tag, VR::US, PrimitiveValue::from(value)));
}

/// Encode `slice` as a DICOM Part 10 file with preamble.
pub fn dicom_file(slice: &CtSlice) -> Vec<u8> {
    let (object, sop_instance_uid) = ct_object(slice);
    let file = object
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                .media_storage_sop_class_uid(uids::CT_IMAGE_STORAGE)
                .media_storage_sop_instance_uid(sop_instance_uid),
        )
        .expect("should have built file meta group");

    let mut bytes = Vec::new();
    file.write_all(&mut bytes)
        .expect("should have encoded DICOM file");
    bytes
}

/// Encode `slice` as a bare implicit VR little endian data set, without
/// preamble or file meta group.
pub fn raw_dicom_dataset(slice: &CtSlice) -> Vec<u8> {
    let (object, _) = ct_object(slice);
    let mut bytes = Vec::new();
    object
        .write_dataset_with_ts(&mut bytes, &IMPLICIT_VR_LITTLE_ENDIAN.erased())
        .expect("should have encoded data set");
    bytes
}

fn ct_object(slice: &CtSlice) -> (InMemDicomObject, String) {
    let sop_instance_uid = format!(
        "1.2.826.0.1.3680043.8.498.2.{}",
        NEXT_SOP_INSTANCE.fetch_add(1, Ordering::Relaxed)
    );

    let mut object = InMemDicomObject::new_empty();
    put_str(&mut object, tags::SOP_CLASS_UID, VR::UI, uids::CT_IMAGE_STORAGE);
    put_str(&mut object, tags::SOP_INSTANCE_UID, VR::UI, &sop_instance_uid);
    put_str(&mut object, tags::MODALITY, VR::CS, &slice.modality);
    put_str(
        &mut object,
        tags::STUDY_INSTANCE_UID,
        VR::UI,
        "1.2.826.0.1.3680043.8.498.9",
    );
    if let Some(uid) = &slice.series_uid {
        put_str(&mut object, tags::SERIES_INSTANCE_UID, VR::UI, uid);
    }
    if let Some(number) = slice.instance_number {
        put_str(&mut object, tags::INSTANCE_NUMBER, VR::IS, &number.to_string());
    }
    if let Some(body_part) = &slice.body_part {
        put_str(&mut object, tags::BODY_PART_EXAMINED, VR::CS, body_part);
    }
    if let Some(orientation) = &slice.orientation {
        put_decimals(&mut object, tags::IMAGE_ORIENTATION_PATIENT, orientation);
    }
    if let Some((slope, intercept)) = slice.rescale {
        put_decimals(&mut object, tags::RESCALE_SLOPE, &[slope]);
        put_decimals(&mut object, tags::RESCALE_INTERCEPT, &[intercept]);
    }
    put_decimals(&mut object, tags::PIXEL_SPACING, &[0.7, 0.7]);
    put_decimals(&mut object, tags::SLICE_THICKNESS, &[2.5]);

    if slice.frames.len() > 1 {
        put_str(
            &mut object,
            tags::NUMBER_OF_FRAMES,
            VR::IS,
            &slice.frames.len().to_string(),
        );
    }
    put_u16(&mut object, tags::SAMPLES_PER_PIXEL, 1);
    put_str(&mut object, tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2");
    put_u16(&mut object, tags::ROWS, slice.rows);
    put_u16(&mut object, tags::COLUMNS, slice.columns);
    put_u16(&mut object, tags::BITS_ALLOCATED, 16);
    put_u16(&mut object, tags::BITS_STORED, 16);
    put_u16(&mut object, tags::HIGH_BIT, 15);
    put_u16(&mut object, tags::PIXEL_REPRESENTATION, 0);

    let pixels: Vec<u16> = slice.frames.concat();
    object.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OW,
        PrimitiveValue::U16(pixels.into()),
    ));
    (object, sop_instance_uid)
}

/// A DICOM file whose data set has no pixel data, e.g. a dose summary.
pub fn dicom_without_pixels() -> Vec<u8> {
    let mut object = InMemDicomObject::new_empty();
    put_str(&mut object, tags::SOP_CLASS_UID, VR::UI, uids::CT_IMAGE_STORAGE);
    put_str(&mut object, tags::SOP_INSTANCE_UID, VR::UI, "1.2.826.0.1.3680043.8.498.3");
    put_str(&mut object, tags::MODALITY, VR::CS, "SR");

    let file = object
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                .media_storage_sop_class_uid(uids::CT_IMAGE_STORAGE)
                .media_storage_sop_instance_uid("1.2.826.0.1.3680043.8.498.3"),
        )
        .expect("should have built file meta group");

    let mut bytes = Vec::new();
    file.write_all(&mut bytes)
        .expect("should have encoded DICOM file");
    bytes
}

/// Uncompressed single-file NIfTI-1 with float32 voxels.
///
/// `voxel(i, j, k)` gives the value at voxel `(i, j, k)`; `srow` holds
/// the three sform rows, `None` leaves both sform and qform unset.
pub fn nifti_file(
    dims: [u16; 3],
    pixdim: [f32; 3],
    srow: Option<[[f32; 4]; 3]>,
    voxel: impl Fn(usize, usize, usize) -> f32,
) -> Vec<u8> {
    nifti_time_series(dims, 1, pixdim, srow, |i, j, k, _| voxel(i, j, k))
}

/// Like [`nifti_file`] with `volumes` time points; a 4-D image when
/// `volumes > 1`.
pub fn nifti_time_series(
    dims: [u16; 3],
    volumes: u16,
    pixdim: [f32; 3],
    srow: Option<[[f32; 4]; 3]>,
    voxel: impl Fn(usize, usize, usize, usize) -> f32,
) -> Vec<u8> {
    let mut header = vec![0u8; 352];
    let mut put = |offset: usize, bytes: &[u8]| {
        header[offset..offset + bytes.len()].copy_from_slice(bytes);
    };

    put(0, &348i32.to_le_bytes());
    let rank = if volumes > 1 { 4 } else { 3 };
    let dim: [i16; 8] = [
        rank,
        dims[0] as i16,
        dims[1] as i16,
        dims[2] as i16,
        volumes as i16,
        1,
        1,
        1,
    ];
    for (i, d) in dim.iter().enumerate() {
        put(40 + 2 * i, &d.to_le_bytes());
    }
    put(70, &16i16.to_le_bytes());
    put(72, &32i16.to_le_bytes());
    let pixdims = [1.0f32, pixdim[0], pixdim[1], pixdim[2], 0.0, 0.0, 0.0, 0.0];
    for (i, p) in pixdims.iter().enumerate() {
        put(76 + 4 * i, &p.to_le_bytes());
    }
    put(108, &352f32.to_le_bytes());
    put(112, &1f32.to_le_bytes());
    if let Some(rows) = srow {
        put(254, &1i16.to_le_bytes());
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                put(280 + 16 * r + 4 * c, &value.to_le_bytes());
            }
        }
    }
    put(344, b"n+1\0");

    let mut bytes = header;
    let [nx, ny, nz] = dims.map(usize::from);
    for t in 0..usize::from(volumes) {
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    bytes.extend_from_slice(&voxel(i, j, k, t).to_le_bytes());
                }
            }
        }
    }
    bytes
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("should have compressed");
    encoder.finish().expect("should have finished gzip stream")
}

/// PNG of `width` x `height` 8-bit gray pixels.
pub fn png_file(width: u32, height: u32, pixel: impl Fn(u32, u32) -> u8) -> Vec<u8> {
    let image = image::GrayImage::from_fn(width, height, |x, y| image::Luma([pixel(x, y)]));
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("should have encoded PNG");
    out.into_inner()
}

/// ZIP container with `files` stored uncompressed, in the given order.
pub fn zip_archive<N: AsRef<str>>(files: &[(N, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, data) in files {
        writer.start_file(name.as_ref(), options).expect("should have started entry");
        writer.write_all(data).expect("should have written entry");
    }
    writer
        .finish()
        .expect("should have finished archive")
        .into_inner()
}
