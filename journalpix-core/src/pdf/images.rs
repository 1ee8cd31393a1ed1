//! Image XObjects of a page, turned into standalone image files.
//!
//! JPEG and JPEG 2000 streams already are complete files and pass through
//! unchanged. Every other image is decoded to samples and re-encoded as PNG.

use super::PdfDocument;
use crate::page::PageImage;
use anyhow::{Context, Result, anyhow, bail};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Object, Stream};
use std::io::Cursor;

/// Upper bound on nested Form XObjects, which may reference each other.
const MAX_FORM_DEPTH: usize = 8;

/// Images of an `/XObject` dictionary in declaration order, descending into
/// Form XObjects where they are declared.
pub(super) fn collect(pdf: &PdfDocument, xobjects: &Dictionary) -> Result<Vec<PageImage>> {
    let mut images = Vec::new();
    walk(pdf, xobjects, "", 0, &mut images)?;
    Ok(images)
}

fn walk(
    pdf: &PdfDocument,
    xobjects: &Dictionary,
    prefix: &str,
    depth: usize,
    images: &mut Vec<PageImage>,
) -> Result<()> {
    for (name, object) in xobjects.iter() {
        let Ok(stream) = pdf.resolve(object)?.as_stream() else {
            continue;
        };
        let name = format!("{prefix}{}", String::from_utf8_lossy(name));
        match subtype(stream) {
            Some(b"Image") => {
                let image = image_from_stream(pdf, &name, stream)
                    .with_context(|| format!("decoding image {name}"))?;
                images.push(image);
            }
            Some(b"Form") if depth < MAX_FORM_DEPTH => {
                if let Some(nested) = form_xobjects(pdf, stream)? {
                    walk(pdf, nested, &format!("{name}-"), depth + 1, images)?;
                }
            }
            Some(b"Form") => tracing::warn!(form = %name, "form nesting too deep; skipping"),
            _ => {}
        }
    }
    Ok(())
}

fn subtype(stream: &Stream) -> Option<&[u8]> {
    stream.dict.get(b"Subtype").and_then(Object::as_name).ok()
}

fn form_xobjects<'a>(pdf: &'a PdfDocument, form: &'a Stream) -> Result<Option<&'a Dictionary>> {
    let Ok(resources) = form.dict.get(b"Resources") else {
        return Ok(None);
    };
    let resources = pdf.resolve(resources)?.as_dict()?;
    match resources.get(b"XObject") {
        Ok(xobjects) => Ok(Some(pdf.resolve(xobjects)?.as_dict()?)),
        Err(_) => Ok(None),
    }
}

/// Last filter in the stream's `/Filter` chain, i.e. the encoding of the decoded bytes.
fn final_filter(stream: &Stream) -> Option<Vec<u8>> {
    match stream.dict.get(b"Filter").ok()? {
        Object::Name(name) => Some(name.clone()),
        Object::Array(filters) => filters.last()?.as_name().ok().map(<[u8]>::to_vec),
        _ => None,
    }
}

fn image_from_stream(pdf: &PdfDocument, name: &str, stream: &Stream) -> Result<PageImage> {
    match final_filter(stream).as_deref() {
        Some(b"DCTDecode") => Ok(PageImage::new(format!("{name}.jpg"), stream.content.clone())),
        Some(b"JPXDecode") => Ok(PageImage::new(format!("{name}.jp2"), stream.content.clone())),
        _ => {
            let png = encode_png(pdf, stream)?;
            tracing::debug!(image = name, bytes = png.len(), "re-encoded image as PNG");
            Ok(PageImage::new(format!("{name}.png"), png))
        }
    }
}

/// Colour spaces whose samples can be mapped to gray or RGB pixels.
#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<ColorSpace>,
        palette: Vec<u8>,
    },
}

impl ColorSpace {
    fn components(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed { .. } => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }

    fn parse(pdf: &PdfDocument, object: &Object) -> Result<Self> {
        match pdf.resolve(object)? {
            Object::Name(name) => Self::from_name(name),
            Object::Array(parts) => {
                let family = parts
                    .first()
                    .ok_or_else(|| anyhow!("empty colour space array"))?
                    .as_name()?;
                match family {
                    b"ICCBased" => {
                        let profile = pdf.resolve(part(parts, 1)?)?.as_stream()?;
                        match profile.dict.get(b"N").and_then(Object::as_i64) {
                            Ok(1) => Ok(ColorSpace::Gray),
                            Ok(3) => Ok(ColorSpace::Rgb),
                            Ok(4) => Ok(ColorSpace::Cmyk),
                            _ => Self::parse(pdf, profile.dict.get(b"Alternate")?),
                        }
                    }
                    b"Indexed" | b"I" => {
                        let base = Self::parse(pdf, part(parts, 1)?)?;
                        let palette = match pdf.resolve(part(parts, 3)?)? {
                            Object::String(bytes, _) => bytes.clone(),
                            Object::Stream(stream) => stream.get_plain_content()?,
                            _ => bail!("palette is neither a string nor a stream"),
                        };
                        Ok(ColorSpace::Indexed {
                            base: Box::new(base),
                            palette,
                        })
                    }
                    _ if parts.len() == 1 => Self::from_name(family),
                    b"CalGray" => Ok(ColorSpace::Gray),
                    b"CalRGB" => Ok(ColorSpace::Rgb),
                    other => bail!("unsupported colour space /{}", String::from_utf8_lossy(other)),
                }
            }
            _ => bail!("colour space is neither a name nor an array"),
        }
    }

    fn from_name(name: &[u8]) -> Result<Self> {
        match name {
            b"DeviceGray" | b"CalGray" | b"G" => Ok(ColorSpace::Gray),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(ColorSpace::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(ColorSpace::Cmyk),
            other => bail!("unsupported colour space /{}", String::from_utf8_lossy(other)),
        }
    }
}

fn part(parts: &[Object], position: usize) -> Result<&Object> {
    parts
        .get(position)
        .ok_or_else(|| anyhow!("colour space array is missing entry {position}"))
}

fn encode_png(pdf: &PdfDocument, stream: &Stream) -> Result<Vec<u8>> {
    let width = dimension(stream, b"Width")?;
    let height = dimension(stream, b"Height")?;
    let image_mask = stream
        .dict
        .get(b"ImageMask")
        .and_then(Object::as_bool)
        .unwrap_or(false);
    let (space, bits) = if image_mask {
        (ColorSpace::Gray, 1)
    } else {
        let space = stream
            .dict
            .get(b"ColorSpace")
            .map_err(|_| anyhow!("image has no /ColorSpace"))?;
        let bits = stream
            .dict
            .get(b"BitsPerComponent")
            .and_then(Object::as_i64)
            .unwrap_or(8);
        (ColorSpace::parse(pdf, space)?, bits)
    };
    let bits = u8::try_from(bits).map_err(|_| anyhow!("unsupported bits per component: {bits}"))?;

    let data = decoded_data(stream)?;
    let samples = unpack(&data, width, height, space.components(), bits)?;
    let image = to_image(&space, samples, bits.min(8), width, height)?;

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .context("encoding PNG")?;
    Ok(png)
}

fn dimension(stream: &Stream, key: &[u8]) -> Result<u32> {
    let value = stream
        .dict
        .get(key)
        .and_then(Object::as_i64)
        .map_err(|_| anyhow!("image has no /{}", String::from_utf8_lossy(key)))?;
    match u32::try_from(value) {
        Ok(value) if value > 0 => Ok(value),
        _ => bail!("invalid image /{} {value}", String::from_utf8_lossy(key)),
    }
}

fn decoded_data(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_err() {
        return Ok(stream.content.clone());
    }
    // lopdf only decompresses streams that are not marked as images.
    let mut plain = stream.clone();
    plain.dict.remove(b"Subtype");
    plain.decompressed_content().map_err(|e| {
        let filter = final_filter(stream).unwrap_or_default();
        anyhow!("cannot decode /{} image data: {e}", String::from_utf8_lossy(&filter))
    })
}

/// One byte per sample, rows unpadded. 16-bit samples keep their high byte.
fn unpack(data: &[u8], width: u32, height: u32, components: usize, bits: u8) -> Result<Vec<u8>> {
    let per_row = width as usize * components;
    let row_bytes = (per_row * bits as usize).div_ceil(8);
    let needed = row_bytes * height as usize;
    if data.len() < needed {
        bail!("image data is {} bytes, expected {needed}", data.len());
    }

    let mut samples = Vec::with_capacity(per_row * height as usize);
    for row in data[..needed].chunks(row_bytes) {
        match bits {
            8 => samples.extend_from_slice(&row[..per_row]),
            16 => samples.extend(row.chunks(2).take(per_row).map(|pair| pair[0])),
            1 | 2 | 4 => {
                let per_byte = usize::from(8 / bits);
                let mask = (1u8 << bits) - 1;
                samples.extend((0..per_row).map(|i| {
                    let slot = (i % per_byte) as u8;
                    (row[i / per_byte] >> (8 - bits * (slot + 1))) & mask
                }));
            }
            _ => bail!("unsupported bits per component: {bits}"),
        }
    }
    Ok(samples)
}

fn to_image(
    space: &ColorSpace,
    samples: Vec<u8>,
    bits: u8,
    width: u32,
    height: u32,
) -> Result<DynamicImage> {
    let image = match space {
        ColorSpace::Indexed { base, palette } => {
            let n = base.components();
            let mut colors = Vec::with_capacity(samples.len() * n);
            for index in samples {
                let start = usize::from(index) * n;
                let entry = palette
                    .get(start..start + n)
                    .ok_or_else(|| anyhow!("colour index {index} is outside the palette"))?;
                colors.extend_from_slice(entry);
            }
            return to_image(base, colors, 8, width, height);
        }
        ColorSpace::Gray => {
            GrayImage::from_raw(width, height, scale(samples, bits)).map(DynamicImage::ImageLuma8)
        }
        ColorSpace::Rgb => {
            RgbImage::from_raw(width, height, scale(samples, bits)).map(DynamicImage::ImageRgb8)
        }
        ColorSpace::Cmyk => RgbImage::from_raw(width, height, cmyk_to_rgb(&scale(samples, bits)))
            .map(DynamicImage::ImageRgb8),
    };
    image.ok_or_else(|| anyhow!("image data does not fill {width}x{height} pixels"))
}

/// Stretches samples of fewer than 8 bits to the full byte range.
fn scale(samples: Vec<u8>, bits: u8) -> Vec<u8> {
    if bits >= 8 {
        return samples;
    }
    let max = u16::from((1u8 << bits) - 1);
    samples
        .into_iter()
        .map(|value| (u16::from(value) * 255 / max) as u8)
        .collect()
}

fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    samples
        .chunks_exact(4)
        .flat_map(|pixel| {
            let k = 255 - u16::from(pixel[3]);
            [pixel[0], pixel[1], pixel[2]].map(|ink| ((255 - u16::from(ink)) * k / 255) as u8)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Document, ObjectId, dictionary};

    fn flate(data: &[u8]) -> Vec<u8> {
        let mut stream = Stream::new(dictionary! {}, data.to_vec());
        stream.compress().unwrap();
        assert!(stream.dict.has(b"Filter"), "test data must be compressible");
        stream.content
    }

    fn rgb_stream(width: i64, height: i64, pixels: &[u8]) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            flate(pixels),
        )
    }

    fn empty_pdf() -> PdfDocument {
        PdfDocument::from_document(Document::with_version("1.5"))
    }

    fn decode_png(data: &[u8]) -> DynamicImage {
        image::load_from_memory_with_format(data, ImageFormat::Png).unwrap()
    }

    #[test]
    fn flate_rgb_image_becomes_png() {
        let pixels: Vec<u8> = (0..256u32)
            .flat_map(|i| [(i % 16 * 16) as u8, 0, 255])
            .collect();
        let stream = rgb_stream(16, 16, &pixels);

        let image = image_from_stream(&empty_pdf(), "Im3", &stream).unwrap();

        assert_eq!(image.id, "Im3.png");
        let decoded = decode_png(&image.data).to_rgb8();
        assert_eq!(decoded.dimensions(), (16, 16));
        assert_eq!(decoded.into_raw(), pixels);
    }

    #[test]
    fn jpeg_passes_through_unchanged() {
        let stream = Stream::new(
            dictionary! { "Subtype" => "Image", "Filter" => "DCTDecode" },
            vec![0xFF, 0xD8, 0xFF],
        );
        let image = image_from_stream(&empty_pdf(), "Im1", &stream).unwrap();
        assert_eq!(image.id, "Im1.jpg");
        assert_eq!(image.data, vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn unfiltered_gray_image_becomes_png() {
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 3,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0, 128, 255],
        );
        let image = image_from_stream(&empty_pdf(), "Im2", &stream).unwrap();
        assert_eq!(decode_png(&image.data).to_luma8().into_raw(), vec![0, 128, 255]);
    }

    #[test]
    fn indexed_image_expands_palette() {
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 1,
                "ColorSpace" => vec![
                    Object::Name(b"Indexed".to_vec()),
                    Object::Name(b"DeviceRGB".to_vec()),
                    1.into(),
                    Object::String(vec![10, 20, 30, 200, 210, 220], lopdf::StringFormat::Hexadecimal),
                ],
                "BitsPerComponent" => 8,
            },
            vec![1, 0],
        );
        let image = image_from_stream(&empty_pdf(), "Im4", &stream).unwrap();
        assert_eq!(
            decode_png(&image.data).to_rgb8().into_raw(),
            vec![200, 210, 220, 10, 20, 30]
        );
    }

    #[test]
    fn one_bit_mask_is_stretched_to_gray() {
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 3,
                "Height" => 1,
                "ImageMask" => true,
            },
            vec![0b1010_0000],
        );
        let image = image_from_stream(&empty_pdf(), "Im5", &stream).unwrap();
        assert_eq!(decode_png(&image.data).to_luma8().into_raw(), vec![255, 0, 255]);
    }

    #[test]
    fn short_image_data_is_an_error() {
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 4,
                "Height" => 4,
                "ColorSpace" => "DeviceRGB",
            },
            vec![0, 0, 0],
        );
        let err = image_from_stream(&empty_pdf(), "Im6", &stream).unwrap_err();
        assert!(err.to_string().contains("expected 48"));
    }

    #[test]
    fn unsupported_colour_space_is_an_error() {
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "Lab",
            },
            vec![0, 0, 0],
        );
        let err = image_from_stream(&empty_pdf(), "Im7", &stream).unwrap_err();
        assert!(err.to_string().contains("/Lab"));
    }

    #[test]
    fn cmyk_converts_to_rgb() {
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0, 255, 0, 0, 0]), vec![255, 255, 255, 0, 255, 255]);
    }

    #[test]
    fn filter_chain_uses_last_filter() {
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Filter" => vec![Object::Name(b"ASCIIHexDecode".to_vec()), Object::Name(b"DCTDecode".to_vec())],
            },
            Vec::new(),
        );
        assert_eq!(final_filter(&stream).as_deref(), Some(&b"DCTDecode"[..]));
    }

    fn jpeg(doc: &mut Document, payload: &[u8]) -> ObjectId {
        doc.add_object(Stream::new(
            dictionary! { "Subtype" => "Image", "Filter" => "DCTDecode" },
            payload.to_vec(),
        ))
    }

    #[test]
    fn images_inside_forms_keep_declaration_order() {
        let mut doc = Document::with_version("1.5");
        let avatar = jpeg(&mut doc, b"avatar");
        let photo = jpeg(&mut doc, b"photo");
        let last = jpeg(&mut doc, b"last");
        let form = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "Resources" => dictionary! {
                    "XObject" => dictionary! { "Im1" => photo },
                },
            },
            Vec::new(),
        ));
        let xobjects = dictionary! {
            "Fm0" => dictionary! {},
            "Im0" => avatar,
            "Fm1" => form,
            "Im2" => last,
        };
        let pdf = PdfDocument::from_document(doc);

        let images = collect(&pdf, &xobjects).unwrap();

        let ids: Vec<&str> = images.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["Im0.jpg", "Fm1-Im1.jpg", "Im2.jpg"]);
        assert_eq!(images[1].data, b"photo".to_vec());
    }

    #[test]
    fn self_referencing_form_terminates() {
        let mut doc = Document::with_version("1.5");
        let form_id = doc.new_object_id();
        doc.objects.insert(
            form_id,
            Object::Stream(Stream::new(
                dictionary! {
                    "Subtype" => "Form",
                    "Resources" => dictionary! {
                        "XObject" => dictionary! { "Fm0" => form_id },
                    },
                },
                Vec::new(),
            )),
        );
        let xobjects = dictionary! { "Fm0" => form_id };
        let pdf = PdfDocument::from_document(doc);

        assert!(collect(&pdf, &xobjects).unwrap().is_empty());
    }
}
