//! Operation catalog
//!
//! Each command is a thin mapping from typed arguments to a protocol request.

use crate::application::operation::{OperationDescriptor, ParamSpec, ParsedArgs, Registry};
use crate::domain::{DomainError, Request};

/// All operations offered by the client.
pub fn registry() -> Result<Registry, DomainError> {
    Registry::new(operations())
}

pub fn operations() -> Vec<OperationDescriptor> {
    vec![
        // virtual machines
        OperationDescriptor::new(
            "vm-create",
            "Create virtual machine.",
            "VM|STATUS",
            vm_create,
        )
        .param(
            ParamSpec::positional("image", "Image to create the virtual machine.")
                .metavar("IMAGE"),
        )
        .param(
            ParamSpec::positional("vlan", "VLAN attached to the virtual machine to create.")
                .integer()
                .metavar("VLAN"),
        )
        .param(
            ParamSpec::option("name", "Hostname of the virtual machine to create.")
                .metavar("NAME"),
        )
        .param(
            ParamSpec::option("cpu", "CPU number of the virtual machine to create.")
                .integer()
                .metavar("CPU"),
        )
        .param(
            ParamSpec::option("memory", "Memory size in Mega bytes.")
                .integer()
                .metavar("MEMORY"),
        )
        .param(
            ParamSpec::option("increase", "Disk size to increase in Giga bytes.")
                .integer()
                .metavar("DISK SIZE"),
        ),
        OperationDescriptor::new(
            "vm-list",
            "List virtual machines.",
            "VM|IMAGE|IP|NAME|VXLAN|STATUS|VNC",
            vm_list,
        ),
        OperationDescriptor::new(
            "vm-delete",
            "Delete virtual machine.",
            "VM|STATUS",
            vm_delete,
        )
        .param(
            ParamSpec::positional("vm", "The virtual machine to be deleted.")
                .metavar("VM"),
        ),
        // images
        OperationDescriptor::new(
            "image-list",
            "List images.",
            "IMAGE|SIZE|OS|DESC|OWNER",
            image_list,
        ),
        OperationDescriptor::new("image-show", "Show image.", "PROPERTY|VALUE", image_show)
            .param(
                ParamSpec::positional("image", "The image to be shown.")
                    .metavar("IMAGE"),
            )
            .record(),
        OperationDescriptor::new(
            "image-create",
            "Create image.",
            "IMAGE|STATUS",
            image_create,
        )
        .param(
            ParamSpec::positional("url", "The url to the image binary.")
                .metavar("IMAGE URL"),
        )
        .param(
            ParamSpec::positional(
                "platform",
                "The OS platform of the image (linux or windows).",
            )
            .metavar("OS PLATFORM"),
        )
        .param(
            ParamSpec::option("shared", "Share the image or not (true or false).")
                .boolean()
                .metavar("SHARED"),
        )
        .param(
            ParamSpec::option("desc", "Image description.")
                .metavar("DESC"),
        ),
        OperationDescriptor::new(
            "image-delete",
            "Delete image.",
            "IMAGE|STATUS",
            image_delete,
        )
        .param(
            ParamSpec::positional("image", "The image to be deleted.")
                .metavar("IMAGE"),
        ),
        // networks
        OperationDescriptor::new("vlan-list", "List vlan.", "VLAN|DESC|OWNER", vlan_list),
        OperationDescriptor::new("vlan-create", "Create vlan.", "VLAN|STATUS", vlan_create)
            .param(
                ParamSpec::positional("vlan", "VLAN number, for example, 5001.")
                    .integer()
                    .metavar("VLAN"),
            )
            .param(
                ParamSpec::positional("network", "Network, for example, 172.16.1.0.")
                    .metavar("NETWORK"),
            )
            .param(
                ParamSpec::positional("netmask", "Netmask, for example, 255.255.255.0.")
                    .metavar("NETMASK"),
            )
            .param(
                ParamSpec::option("gateway", "Gateway, for example, 172.16.1.1.")
                    .metavar("GATEWAY"),
            )
            .param(
                ParamSpec::option("begin", "Start IP, for example, 172.16.1.2.")
                    .metavar("START IP"),
            )
            .param(
                ParamSpec::option("end", "End IP, for example, 172.16.1.10.")
                    .metavar("END IP"),
            )
            .param(
                ParamSpec::option("shared", "Shared with others or not.")
                    .boolean()
                    .metavar("SHARED"),
            )
            .param(
                ParamSpec::option("use_dhcp", "Use DHCP or not.")
                    .boolean()
                    .metavar("USE_DHCP"),
            ),
        OperationDescriptor::new("vlan-delete", "Delete vlan.", "VLAN|STATUS", vlan_delete)
            .param(
                ParamSpec::positional("vlan", "Existing VLAN number, for example, 5001.")
                    .integer()
                    .metavar("VLAN"),
            ),
        OperationDescriptor::new(
            "vlan-attach",
            "Attach vlan to virtual machine.",
            "VM|VLAN|STATUS",
            vlan_attach,
        )
        .param(
            ParamSpec::positional("vlan", "VLAN to attach to VM.")
                .integer()
                .metavar("VLAN"),
        )
        .param(
            ParamSpec::positional("vm", "The virtual machine to be attached VLAN.")
                .metavar("VM"),
        ),
        // volumes
        OperationDescriptor::new(
            "volume-list",
            "List volumes.",
            "VOLUME|SIZE|DESC|VM|DEVICE|BOOTABLE|STATUS",
            volume_list,
        ),
        OperationDescriptor::new(
            "volume-create",
            "Create volume.",
            "VOLUME|STATUS",
            volume_create,
        )
        .param(
            ParamSpec::positional("size", "Volume size in G.")
                .integer()
                .metavar("VOLUME SIZE"),
        )
        .param(
            ParamSpec::option("image", "Create volume from IMAGE.")
                .metavar("IMAGE"),
        )
        .param(
            ParamSpec::option("desc", "Volume description.")
                .metavar("DESC"),
        ),
        OperationDescriptor::new(
            "volume-delete",
            "Delete volume.",
            "VOLUME|STATUS",
            volume_delete,
        )
        .param(
            ParamSpec::positional("volume", "The volume to be deleted.")
                .metavar("VOLUME"),
        ),
        OperationDescriptor::new(
            "volume-attach",
            "Attach volume to virtual machine.",
            "VM|VOLUME|STATUS",
            volume_attach,
        )
        .param(
            ParamSpec::positional("volume", "The volume to attach.")
                .metavar("VOLUME"),
        )
        .param(
            ParamSpec::positional("vm", "The VM to attach volume to.")
                .metavar("VM"),
        ),
        OperationDescriptor::new(
            "volume-detach",
            "Detach volume.",
            "VM|VOLUME|STATUS",
            volume_detach,
        )
        .param(
            ParamSpec::positional("volume", "The volume to detach.")
                .metavar("VOLUME"),
        ),
        // snapshots
        OperationDescriptor::new(
            "snapshot-list",
            "List snapshots.",
            "SNAPSHOT|VM|DESC|STATUS",
            snapshot_list,
        ),
        OperationDescriptor::new(
            "snapshot-create",
            "Snapshot virtual machine.",
            "SNAPSHOT|STATUS",
            snapshot_create,
        )
        .param(
            ParamSpec::positional("vm", "The virtual machine to snapshot.")
                .metavar("VM"),
        )
        .param(
            ParamSpec::option("desc", "Snapshot description.")
                .metavar("DESC"),
        ),
        OperationDescriptor::new(
            "snapshot-delete",
            "Delete snapshot.",
            "SNAPSHOT|STATUS",
            snapshot_delete,
        )
        .param(
            ParamSpec::positional("snapshot", "The snapshot to be deleted.")
                .metavar("SNAPSHOT"),
        ),
    ]
}

fn vm_list(_: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::read("get_vm_list"))
}

fn vm_delete(args: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::mutate("clear_vm")
        .field("vm_ID", args.require("vm")?))
}

fn image_list(_: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::read("get_img_list"))
}

fn image_show(args: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::read("get_img")
        .field("name", args.require("image")?))
}

fn image_delete(args: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::mutate("delete_img")
        .field("img_name", args.require("image")?))
}

fn vlan_list(_: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::read("get_link_list"))
}

fn vlan_delete(args: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::mutate("clear_net")
        .field("vlan", args.require("vlan")?))
}

fn vlan_attach(args: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::mutate("attach_nic")
        .field("vlan", args.require("vlan")?)
        .field("vm_ID", args.require("vm")?))
}

fn volume_list(_: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::read("get_vol_list"))
}

fn volume_create(args: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::mutate("create_vol")
        .field("vol_size", args.require("size")?)
        .optional("img_name", args.value("image"))
        .optional("vol_desc", args.value("desc")))
}

fn volume_delete(args: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::mutate("delete_vol")
        .field("vol_name", args.require("volume")?))
}

fn volume_attach(args: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::mutate("attach_vol")
        .field("vol_name", args.require("volume")?)
        .field("vm_ID", args.require("vm")?))
}

fn volume_detach(args: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::mutate("detach_vol")
        .field("vol_name", args.require("volume")?))
}

fn snapshot_list(_: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::read("get_snap_list"))
}

fn snapshot_create(args: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::mutate("create_snap")
        .field("vm_ID", args.require("vm")?)
        .optional("snap_desc", args.value("desc")))
}

fn snapshot_delete(args: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::mutate("delete_snap")
        .field("snap_name", args.require("snapshot")?))
}

fn vm_create(args: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::mutate("launch_vm")
        .field("image", args.require("image")?)
        .field("vlan", args.require("vlan")?)
        .optional("name", args.value("name"))
        .optional("cpu", args.value("cpu"))
        .optional("memory", args.value("memory"))
        .optional("disk_inc", args.value("increase")))
}

fn image_create(args: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::mutate("upload_img")
        .field("img_url", args.require("url")?)
        .field("platform", args.require("platform")?)
        .optional("shared", args.value("shared"))
        .optional("img_desc", args.value("desc")))
}

fn vlan_create(args: &ParsedArgs) -> Result<Request, DomainError> {
    Ok(Request::mutate("create_net")
        .field("vlan", args.require("vlan")?)
        .field("network", args.require("network")?)
        .field("netmask", args.require("netmask")?)
        .optional("gateway", args.value("gateway"))
        .optional("start_ip", args.value("begin"))
        .optional("end_ip", args.value("end"))
        .optional("shared", args.value("shared"))
        // remote field name, misspelled on the server side
        .optional("use_dpcp", args.value("use_dhcp")))
}
